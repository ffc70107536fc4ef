//! Train, car, and drive-phase state
//!
//! A train is a head that follows legs, plus a consist of trailing cars
//! posed at fixed arc distances behind it along the recorded trail.
//! Everything here is plain data; motion happens in the tick module.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::TrainConfig;
use crate::ground;
use crate::sim::gate::Obstacle;
use crate::sim::path::{LegPath, Pose};
use crate::sim::tape::TrailTape;

/// Where a train is in its drive cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrivePhase {
    #[default]
    Idle,
    /// Leg accepted, cars posed, no distance covered yet
    Seeding,
    Advancing,
    /// Leg finished this tick; drops back to Idle on the next one
    Arrived,
}

/// One trailing car
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: u32,
    /// Arc distance from the head to this car's center
    pub offset: f32,
    pub pose: Pose,
}

/// A head plus its consist, trail record, and current leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    pub id: u32,
    pub config: TrainConfig,
    /// Head speed in meters per second
    pub speed: f32,
    pub phase: DrivePhase,
    pub(crate) path: Option<LegPath>,
    /// Arc distance covered along the current leg
    pub(crate) s_head: f32,
    pub(crate) tape: TrailTape,
    pub(crate) head_pose: Pose,
    pub(crate) cars: Vec<Car>,
    /// Consist size when the last leg was accepted, for offset reuse
    pub(crate) cars_at_last_leg: Option<usize>,
    next_id: u32,
}

impl Train {
    pub fn new(id: u32, config: TrainConfig) -> Self {
        Self {
            id,
            speed: config.speed,
            config,
            phase: DrivePhase::Idle,
            path: None,
            s_head: 0.0,
            tape: TrailTape::new(),
            head_pose: Pose::default(),
            cars: Vec::new(),
            cars_at_last_leg: None,
            next_id: 0,
        }
    }

    #[inline]
    pub fn head_pose(&self) -> Pose {
        self.head_pose
    }

    #[inline]
    pub fn s_head(&self) -> f32 {
        self.s_head
    }

    /// Length of the current leg, 0 when idle
    pub fn leg_length(&self) -> f32 {
        self.path.as_ref().map(|p| p.total_length()).unwrap_or(0.0)
    }

    #[inline]
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// Distance walkable behind the head, recorded trail plus prefix
    #[inline]
    pub fn trail_coverage(&self) -> f32 {
        self.tape.coverage()
    }

    fn next_car_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a car one canonical slot behind the current last car
    pub fn append_car(&mut self) -> u32 {
        let offset = match self.cars.last() {
            Some(car) => car.offset + self.config.next_offset(),
            None => self.config.first_offset(),
        };
        self.append_car_at_offset(offset)
    }

    /// Add a car at an explicit arc distance behind the head
    pub fn append_car_at_offset(&mut self, offset: f32) -> u32 {
        let offset = offset.max(0.0);
        if !self.tape.is_empty() && offset > self.tape.coverage() {
            log::warn!(
                "train {}: car offset {:.2} beyond trail coverage {:.2}",
                self.id,
                offset,
                self.tape.coverage()
            );
        }
        let id = self.next_car_id();
        let pose = self.pose_behind(offset);
        self.cars.push(Car { id, offset, pose });
        id
    }

    /// Register an externally placed car by world position
    ///
    /// The offset is a projection onto the head's current facing; the next
    /// leg start resolves it against that leg's tangent, since the consist
    /// changed.
    pub fn add_car_at(&mut self, position: Vec3) -> u32 {
        let tangent = self.head_pose.tangent;
        let offset = (self.head_pose.position - position).dot(tangent).max(0.0);
        let id = self.next_car_id();
        self.cars.push(Car {
            id,
            offset,
            pose: Pose { position, tangent },
        });
        id
    }

    /// Remove a car by id; remaining cars keep their offsets
    pub fn remove_car(&mut self, id: u32) -> bool {
        let before = self.cars.len();
        self.cars.retain(|c| c.id != id);
        self.cars.len() != before
    }

    /// Pose `offset` meters behind the head, walking the trail when one
    /// exists and a straight line behind the head otherwise
    pub fn pose_behind(&self, offset: f32) -> Pose {
        if self.tape.is_empty() {
            let tangent = self.head_pose.tangent;
            return Pose {
                position: self.head_pose.position - tangent * offset.max(0.0),
                tangent,
            };
        }
        self.tape.sample_back(offset).pose
    }

    /// Repose every car behind the current head
    pub(crate) fn place_cars(&mut self) {
        if self.tape.is_empty() {
            let head = self.head_pose;
            for car in &mut self.cars {
                car.pose = Pose {
                    position: head.position - head.tangent * car.offset,
                    tangent: head.tangent,
                };
            }
            return;
        }
        let mut shortfall = 0;
        for car in &mut self.cars {
            let sample = self.tape.sample_back(car.offset);
            if !sample.covered {
                shortfall += 1;
            }
            car.pose = sample.pose;
        }
        if shortfall > 0 {
            log::debug!(
                "train {}: {} cars past trail coverage {:.2}",
                self.id,
                shortfall,
                self.tape.coverage()
            );
        }
    }

    /// Trail length worth keeping for the current consist
    pub(crate) fn tape_capacity(&self) -> f32 {
        let offsets: f32 = self.cars.iter().map(|c| c.offset).sum();
        offsets + self.config.tape_margin()
    }

    /// Arc distance from the head to the back of the rearmost car
    fn rear_extent(&self) -> f32 {
        let cart_half = self.config.cart_length() * 0.5;
        self.cars
            .iter()
            .map(|c| c.offset + cart_half)
            .fold(self.config.head_half_length(), f32::max)
    }
}

impl Obstacle for Train {
    fn occupied_rear_slice(&self, safety_gap: f32, step: f32) -> Option<Vec<Vec2>> {
        if self.tape.is_empty() {
            return None;
        }
        let extent = self.rear_extent() + safety_gap.max(0.0);
        let resolution = step.max(1e-3);
        let mut points = Vec::new();
        let mut back = 0.0;
        loop {
            points.push(ground(self.tape.sample_back(back).pose.position));
            if back >= extent {
                break;
            }
            back = (back + resolution).min(extent);
        }
        Some(points)
    }
}
