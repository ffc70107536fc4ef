//! Leg lifecycle and per-tick motion
//!
//! `start_leg` validates and accepts a new leg, `tick` advances one train
//! against read-only views of the others, and `tick_all` drives a whole
//! slice in stable order. Ticks are pure functions of state and `dt`; no
//! wall-clock time is read anywhere.

use glam::Vec3;
use thiserror::Error;

use crate::sim::gate::{allowed_advance, Obstacle};
use crate::sim::path::LegPath;
use crate::sim::state::{DrivePhase, Train};

/// Why a leg was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LegError {
    #[error("a leg needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("train already has a leg in flight")]
    AlreadyInFlight,
}

/// What one tick did to a train
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Arc distance the head actually covered
    pub advanced: f32,
    /// Advance was capped short by another vehicle
    pub blocked: bool,
    /// Leg completed this tick
    pub arrived: bool,
}

/// Accept a new leg for an idle or arrived train
///
/// When the consist changed since the previous leg, car offsets are
/// recomputed by projecting each car's live position onto the leg's start
/// direction; otherwise the existing offsets are kept as-is.
pub fn start_leg(train: &mut Train, points: &[Vec3]) -> Result<(), LegError> {
    if matches!(train.phase, DrivePhase::Seeding | DrivePhase::Advancing) {
        return Err(LegError::AlreadyInFlight);
    }
    let Some(mut path) = LegPath::new(points) else {
        return Err(LegError::TooFewPoints(points.len()));
    };

    let start = path.sample_at(0.0);
    if train.cars_at_last_leg != Some(train.cars.len()) {
        for car in &mut train.cars {
            car.offset = (start.position - car.pose.position)
                .dot(start.tangent)
                .max(0.0);
        }
    }
    if train.tape.is_empty() {
        let prefix = train.config.prefix_length();
        train
            .tape
            .ensure_prefix(start.position, -start.tangent, prefix);
    }

    log::info!(
        "train {}: leg accepted, {:.2}m over {} points",
        train.id,
        path.total_length(),
        points.len()
    );
    train.s_head = 0.0;
    train.head_pose = start;
    train.path = Some(path);
    train.cars_at_last_leg = Some(train.cars.len());
    train.place_cars();
    train.phase = DrivePhase::Seeding;
    Ok(())
}

/// Abandon the current leg, keeping the trail, consist, and head pose
pub fn cancel_leg(train: &mut Train) {
    if matches!(train.phase, DrivePhase::Seeding | DrivePhase::Advancing) {
        log::info!(
            "train {}: leg cancelled at {:.2}m of {:.2}m",
            train.id,
            train.s_head,
            train.leg_length()
        );
    }
    train.phase = DrivePhase::Idle;
}

/// Advance one train by `dt` seconds against read-only views of the others
pub fn tick(train: &mut Train, dt: f32, others: &[&dyn Obstacle]) -> TickReport {
    match train.phase {
        DrivePhase::Idle => return TickReport::default(),
        DrivePhase::Arrived => {
            train.phase = DrivePhase::Idle;
            return TickReport::default();
        }
        DrivePhase::Seeding => {
            // The seeding tick both opens the leg and covers distance
            train.phase = DrivePhase::Advancing;
        }
        DrivePhase::Advancing => {}
    }

    let want = train.speed * dt;
    if want <= 0.0 {
        return TickReport::default();
    }
    let epsilon = train.config.epsilon();
    let step = train.config.sample_step;
    let safety_gap = train.config.safety_gap;
    let s_head = train.s_head;

    let Some(path) = train.path.as_mut() else {
        train.phase = DrivePhase::Idle;
        return TickReport::default();
    };
    let total = path.total_length();
    let allowed = allowed_advance(path, s_head, want, step, epsilon, safety_gap, others);
    let blocked = allowed + epsilon < want.min((total - s_head).max(0.0));

    if allowed > 0.0 {
        let from = train.head_pose.position;
        train.s_head = (s_head + allowed).min(total);
        train.head_pose = path.sample_at(train.s_head);
        let capacity = train.tape_capacity();
        train.tape.append_segment(from, train.head_pose.position);
        train.tape.trim_to_capacity(capacity);
        train.place_cars();
    }

    if blocked {
        log::debug!(
            "train {}: advance capped at {:.3} of {:.3}",
            train.id,
            allowed,
            want
        );
    }

    let arrived = train.s_head >= total - epsilon && !blocked;
    if arrived {
        train.phase = DrivePhase::Arrived;
        log::info!("train {}: leg complete at {:.2}m", train.id, train.s_head);
    }

    TickReport {
        advanced: allowed,
        blocked,
        arrived,
    }
}

/// Tick every train once, in slice order, each seeing the rest as obstacles
pub fn tick_all(trains: &mut [Train], dt: f32, mut on_arrive: impl FnMut(u32)) {
    for i in 0..trains.len() {
        let (before, rest) = trains.split_at_mut(i);
        let Some((train, after)) = rest.split_first_mut() else {
            continue;
        };
        let others: Vec<&dyn Obstacle> = before
            .iter()
            .map(|t| t as &dyn Obstacle)
            .chain(after.iter().map(|t| t as &dyn Obstacle))
            .collect();
        let report = tick(train, dt, &others);
        if report.arrived {
            on_arrive(train.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainConfig;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    /// Default-config train with the canonical two-car consist
    fn two_car_train(id: u32) -> Train {
        let mut train = Train::new(id, TrainConfig::default());
        train.append_car();
        train.append_car();
        train
    }

    fn drive_to_arrival(train: &mut Train, dt: f32) {
        for _ in 0..200 {
            if tick(train, dt, &[]).arrived {
                return;
            }
        }
        panic!("leg never arrived");
    }

    #[test]
    fn test_leg_needs_two_points() {
        let mut train = two_car_train(1);
        let err = start_leg(&mut train, &[Vec3::ZERO]);
        assert_eq!(err, Err(LegError::TooFewPoints(1)));
        assert_eq!(train.phase, DrivePhase::Idle);
    }

    #[test]
    fn test_leg_rejected_in_flight() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();
        let err = start_leg(&mut train, &[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        assert_eq!(err, Err(LegError::AlreadyInFlight));

        tick(&mut train, 0.5, &[]);
        let err = start_leg(&mut train, &[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        assert_eq!(err, Err(LegError::AlreadyInFlight));
    }

    #[test]
    fn test_seeding_places_cars_without_motion() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)]).unwrap();
        assert_eq!(train.phase, DrivePhase::Seeding);
        assert_eq!(train.s_head(), 0.0);

        // Cars sit on the reserved straight prefix behind the start
        let cars = train.cars();
        assert!((cars[0].pose.position - Vec3::new(-2.3, 0.0, 0.0)).length() < 0.001);
        assert!((cars[1].pose.position - Vec3::new(-3.6, 0.0, 0.0)).length() < 0.001);
        assert!((cars[0].pose.tangent - Vec3::X).length() < 0.001);
    }

    #[test]
    fn test_straight_leg_first_tick() {
        let mut train = two_car_train(1);
        train.speed = 8.0;
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)]).unwrap();

        let report = tick(&mut train, 0.5, &[]);
        assert!((report.advanced - 4.0).abs() < 0.001);
        assert!(!report.blocked);
        assert_eq!(train.phase, DrivePhase::Advancing);
        assert!((train.head_pose().position - Vec3::new(4.0, 0.0, 0.0)).length() < 0.001);
        let cars = train.cars();
        assert!((cars[0].pose.position - Vec3::new(1.7, 0.0, 0.0)).length() < 0.001);
        assert!((cars[1].pose.position - Vec3::new(0.4, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_arrival_reported_once() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();

        let mut arrivals = 0;
        for _ in 0..6 {
            if tick(&mut train, 0.5, &[]).arrived {
                arrivals += 1;
            }
        }
        assert_eq!(arrivals, 1);
        assert!((train.s_head() - 10.0).abs() < 0.001);
        assert_eq!(train.phase, DrivePhase::Idle);
    }

    #[test]
    fn test_chained_leg_from_arrived() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();
        drive_to_arrival(&mut train, 0.5);
        assert_eq!(train.phase, DrivePhase::Arrived);

        start_leg(
            &mut train,
            &[Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 8.0)],
        )
        .unwrap();
        tick(&mut train, 0.5, &[]);
        assert!((train.head_pose().position - Vec3::new(10.0, 0.0, 2.0)).length() < 0.001);
        // Trail from the first leg is still walkable
        assert!(train.trail_coverage() > 10.0);
    }

    #[test]
    fn test_offsets_preserved_when_count_unchanged_and_recomputed_on_change() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();
        drive_to_arrival(&mut train, 0.5);
        let before: Vec<f32> = train.cars().iter().map(|c| c.offset).collect();

        // Same consist: offsets carry over bit-for-bit
        start_leg(
            &mut train,
            &[Vec3::new(10.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 0.0)],
        )
        .unwrap();
        let after: Vec<f32> = train.cars().iter().map(|c| c.offset).collect();
        assert_eq!(before, after);
        drive_to_arrival(&mut train, 0.5);

        // Grown consist: offsets come back from the live poses
        train.append_car();
        start_leg(
            &mut train,
            &[Vec3::new(20.0, 0.0, 0.0), Vec3::new(30.0, 0.0, 0.0)],
        )
        .unwrap();
        let offsets: Vec<f32> = train.cars().iter().map(|c| c.offset).collect();
        assert!((offsets[0] - 2.3).abs() < 0.001);
        assert!((offsets[1] - 3.6).abs() < 0.001);
        assert!((offsets[2] - 4.9).abs() < 0.001);
    }

    #[test]
    fn test_cancel_retains_trail_state() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();
        tick(&mut train, 0.5, &[]);
        tick(&mut train, 0.5, &[]);
        cancel_leg(&mut train);
        assert_eq!(train.phase, DrivePhase::Idle);
        assert!((train.head_pose().position - Vec3::new(4.0, 0.0, 0.0)).length() < 0.001);

        // New leg turns off the abandoned one; cars still walk the old trail
        start_leg(
            &mut train,
            &[Vec3::new(4.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 10.0)],
        )
        .unwrap();
        tick(&mut train, 0.5, &[]);
        let car = train.cars()[0];
        assert!((car.pose.position - Vec3::new(3.7, 0.0, 0.0)).length() < 0.001);

        tick(&mut train, 0.5, &[]);
        let car = train.cars()[0];
        assert!((car.pose.position - Vec3::new(4.0, 0.0, 1.7)).length() < 0.001);
    }

    #[test]
    fn test_zero_dt_idles_in_place() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();
        let report = tick(&mut train, 0.0, &[]);
        assert_eq!(report, TickReport::default());
        assert_eq!(train.s_head(), 0.0);
        assert!((train.head_pose().position - Vec3::ZERO).length() < 0.001);
    }

    #[test]
    fn test_blocked_by_crossing_train_then_released() {
        // Blocker drives north and stops with its consist astride the
        // driver's east-west line at x = 10
        let mut blocker = two_car_train(2);
        start_leg(
            &mut blocker,
            &[Vec3::new(10.0, 0.0, -6.0), Vec3::new(10.0, 0.0, 2.0)],
        )
        .unwrap();
        drive_to_arrival(&mut blocker, 0.5);

        let mut driver = two_car_train(1);
        driver.speed = 2.0;
        start_leg(&mut driver, &[Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)]).unwrap();

        // Free run up to the crossing, touching it exactly
        for _ in 0..5 {
            let report = tick(&mut driver, 1.0, &[&blocker]);
            assert!(!report.blocked);
        }
        assert!((driver.s_head() - 10.0).abs() < 0.001);

        // Fully stopped against the blocker
        for _ in 0..3 {
            let report = tick(&mut driver, 1.0, &[&blocker]);
            assert!(report.blocked);
            assert_eq!(report.advanced, 0.0);
        }
        assert!((driver.s_head() - 10.0).abs() < 0.001);

        // Blocker pulls away north; its trimmed trail frees the crossing
        start_leg(
            &mut blocker,
            &[Vec3::new(10.0, 0.0, 2.0), Vec3::new(10.0, 0.0, 12.0)],
        )
        .unwrap();
        drive_to_arrival(&mut blocker, 0.5);

        let report = tick(&mut driver, 1.0, &[&blocker]);
        assert!(!report.blocked);
        assert!((report.advanced - 2.0).abs() < 0.001);
        assert!((driver.head_pose().position - Vec3::new(12.0, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_tick_all_reports_arrivals_in_order() {
        let mut trains = vec![two_car_train(1), two_car_train(2)];
        start_leg(&mut trains[0], &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();
        start_leg(
            &mut trains[1],
            &[Vec3::new(0.0, 0.0, 50.0), Vec3::new(10.0, 0.0, 50.0)],
        )
        .unwrap();

        let mut arrivals = Vec::new();
        for _ in 0..6 {
            tick_all(&mut trains, 0.5, |id| arrivals.push(id));
        }
        assert_eq!(arrivals, vec![1, 2]);
    }

    #[test]
    fn test_snapshot_restores_mid_leg() {
        let mut train = two_car_train(1);
        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(12.0, 0.0, 0.0)]).unwrap();
        tick(&mut train, 0.5, &[]);
        tick(&mut train, 0.5, &[]);

        let json = serde_json::to_string(&train).unwrap();
        let mut restored: Train = serde_json::from_str(&json).unwrap();

        tick(&mut train, 0.5, &[]);
        tick(&mut restored, 0.5, &[]);
        assert!((train.s_head() - restored.s_head()).abs() < 0.001);
        assert!(
            (train.head_pose().position - restored.head_pose().position).length() < 0.001
        );
        for (a, b) in train.cars().iter().zip(restored.cars()) {
            assert!((a.pose.position - b.pose.position).length() < 0.001);
        }
    }

    #[test]
    fn test_random_walk_run_stays_consistent() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut train = two_car_train(1);
        train.append_car();

        start_leg(&mut train, &[Vec3::ZERO, Vec3::new(9.0, 0.0, 0.0)]).unwrap();
        drive_to_arrival(&mut train, 0.5);

        let mut ticks = 0;
        while ticks < 400 {
            let head = train.head_pose().position;
            let sx = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            let sz = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            let mid = head + Vec3::new(rng.random_range(1..=3) as f32 * 3.0 * sx, 0.0, 0.0);
            let end = mid + Vec3::new(0.0, 0.0, rng.random_range(1..=3) as f32 * 3.0 * sz);
            start_leg(&mut train, &[head, mid, end]).unwrap();

            loop {
                let report = tick(&mut train, 0.5, &[]);
                ticks += 1;

                assert!(train.head_pose().position.is_finite());
                assert!(train.s_head() <= train.leg_length() + 0.001);
                assert!(train.tape.span() <= train.tape_capacity() + 0.001);
                for car in train.cars() {
                    assert!(car.pose.position.is_finite());
                }
                if report.arrived {
                    break;
                }
                assert!(ticks < 2000, "leg never arrived");
            }
            for car in train.cars() {
                assert!(train.tape.sample_back(car.offset).covered);
            }
            tick(&mut train, 0.5, &[]);
            ticks += 1;
        }
    }
}
