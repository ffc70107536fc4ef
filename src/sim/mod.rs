//! Deterministic train motion simulation
//!
//! - Tick-driven only; no wall-clock time is read
//! - Stable iteration order: `tick_all` walks its slice front to back
//! - Trains see each other through read-only obstacle views
//! - No rendering or platform dependencies

pub mod gate;
pub mod geometry;
pub mod path;
pub mod state;
pub mod tape;
pub mod tick;

pub use gate::{allowed_advance, Obstacle};
pub use geometry::{hit_distance, polyline_first_hit, segment_hit, PolylineHit};
pub use path::{LegPath, Pose};
pub use state::{Car, DrivePhase, Train};
pub use tape::{BackSample, TrailTape};
pub use tick::{cancel_leg, start_leg, tick, tick_all, LegError, TickReport};
