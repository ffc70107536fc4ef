//! Tuning knobs for geometry, spacing, and rates
//!
//! Everything scales from `cell_size` so the same consist proportions hold
//! on any grid. Values are plain data and serialize with the train.

use serde::{Deserialize, Serialize};

use crate::consts::{
    BASE_EPSILON, CART_GAP_FRACTION, CART_LENGTH_FRACTION, DEFAULT_CELL_SIZE, DEFAULT_PREFIX_CARS,
    DEFAULT_SAFETY_GAP, DEFAULT_SAMPLE_STEP, DEFAULT_SPEED, HEAD_HALF_FRACTION, TAPE_MARGIN_CELLS,
};

/// Per-train tuning, all distances in world meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Grid cell edge length everything else scales from
    pub cell_size: f32,
    /// Resolution for sampling track polylines in collision checks
    pub sample_step: f32,
    /// Extra clearance kept beyond another vehicle's rear
    pub safety_gap: f32,
    /// Default head speed for new trains, meters per second
    pub speed: f32,
    /// Car count the initial trail prefix reserves room for
    pub prefix_cars: u32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            sample_step: DEFAULT_SAMPLE_STEP,
            safety_gap: DEFAULT_SAFETY_GAP,
            speed: DEFAULT_SPEED,
            prefix_cars: DEFAULT_PREFIX_CARS,
        }
    }
}

impl TrainConfig {
    /// Car body length
    #[inline]
    pub fn cart_length(&self) -> f32 {
        self.cell_size * CART_LENGTH_FRACTION
    }

    /// Gap between coupled bodies
    #[inline]
    pub fn cart_gap(&self) -> f32 {
        self.cell_size * CART_GAP_FRACTION
    }

    /// Half the head vehicle's length
    #[inline]
    pub fn head_half_length(&self) -> f32 {
        self.cell_size * HEAD_HALF_FRACTION
    }

    /// Arc distance from the head to the first car's center
    pub fn first_offset(&self) -> f32 {
        self.head_half_length() + self.cart_gap() + self.cart_length() * 0.5
    }

    /// Center-to-center spacing between consecutive cars
    pub fn next_offset(&self) -> f32 {
        self.cart_length() + self.cart_gap()
    }

    /// Distance tolerance for arrival and cap comparisons
    #[inline]
    pub fn epsilon(&self) -> f32 {
        self.cell_size * BASE_EPSILON
    }

    /// Extra trail kept beyond what the cars reach
    #[inline]
    pub fn tape_margin(&self) -> f32 {
        self.cell_size * TAPE_MARGIN_CELLS
    }

    /// Straight-line history reserved behind a train's first leg start
    pub fn prefix_length(&self) -> f32 {
        let cars = self.prefix_cars.max(1) as f32;
        self.first_offset()
            + (cars - 1.0) * self.next_offset()
            + self.cart_length() * 0.5
            + self.tape_margin()
    }
}
