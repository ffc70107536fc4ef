//! Convoy - path-following trains with exact-trajectory trailing cars
//!
//! A train is a head that drives route legs sampled by arc length, plus a
//! consist of cars that retrace the head's recorded track at fixed
//! spacings. Motion is gated against other trains' occupied track, so a
//! head stops short of a crossing instead of driving through it.
//!
//! - [`config`] - tuning knobs scaled from the grid cell size
//! - [`sim`] - paths, trail tape, collision gate, and the tick loop

pub mod config;
pub mod sim;

pub use config::TrainConfig;
pub use sim::{
    allowed_advance, cancel_leg, start_leg, tick, tick_all, BackSample, Car, DrivePhase, LegError,
    LegPath, Obstacle, Pose, TickReport, TrailTape, Train,
};

use glam::{Vec2, Vec3, Vec3Swizzles};

/// Simulation constants
pub mod consts {
    /// Car body length as a fraction of the grid cell
    pub const CART_LENGTH_FRACTION: f32 = 1.0 / 3.0;

    /// Gap between coupled bodies as a fraction of the grid cell
    pub const CART_GAP_FRACTION: f32 = 0.1;

    /// Half the head vehicle's length as a fraction of the grid cell
    pub const HEAD_HALF_FRACTION: f32 = 0.5;

    /// Distance tolerance per meter of cell size
    pub const BASE_EPSILON: f32 = 1e-4;

    /// Minimum spacing between recorded trail points
    pub const TAPE_DEDUP_EPS: f32 = 1e-3;

    /// Separation applied to coincident leg points
    pub const ZERO_LENGTH_NUDGE: f32 = 1e-3;

    /// Grid cell edge length in meters
    pub const DEFAULT_CELL_SIZE: f32 = 3.0;

    /// Track sampling resolution for collision checks
    pub const DEFAULT_SAMPLE_STEP: f32 = 0.5;

    /// Clearance kept beyond another vehicle's rear
    pub const DEFAULT_SAFETY_GAP: f32 = 0.25;

    /// Head speed in meters per second
    pub const DEFAULT_SPEED: f32 = 4.0;

    /// Car count the initial trail prefix reserves room for
    pub const DEFAULT_PREFIX_CARS: u32 = 8;

    /// Trail kept beyond the rearmost car, in cells
    pub const TAPE_MARGIN_CELLS: f32 = 2.0;
}

/// Ground-plane projection of a world point
#[inline]
pub fn ground(p: Vec3) -> Vec2 {
    p.xz()
}
