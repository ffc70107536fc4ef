//! Advance gating against other vehicles' occupied track
//!
//! Before the head moves, the distance it wants to cover is checked on the
//! ground plane against every other train's occupied rear slice. Travel is
//! split into substeps no longer than half the sampling step so a fast head
//! cannot tunnel through a thin crossing polyline, and the first contact
//! caps the advance for the tick.

use glam::Vec2;

use crate::ground;
use crate::sim::geometry::{hit_distance, polyline_first_hit};
use crate::sim::path::LegPath;

/// Smallest substep worth probing; also the floor for slice resolution
const MIN_CHUNK: f32 = 1e-4;

/// Read-only view of another vehicle's occupied ground span
pub trait Obstacle {
    /// Polyline from head to rear extent plus `safety_gap`, sampled at
    /// `step` resolution; `None` while the vehicle has no trajectory yet
    fn occupied_rear_slice(&self, safety_gap: f32, step: f32) -> Option<Vec<Vec2>>;
}

/// How far the head may advance along `path` this tick, in `[0, want]`
///
/// `want` is clamped to the remaining leg first. Contact with any obstacle
/// slice caps the result at the contact distance; once a substep comes up
/// short the probe stops rather than testing track beyond the contact.
pub fn allowed_advance(
    path: &mut LegPath,
    s_head: f32,
    want: f32,
    step: f32,
    epsilon: f32,
    safety_gap: f32,
    others: &[&dyn Obstacle],
) -> f32 {
    let remaining = (path.total_length() - s_head).max(0.0);
    let want = want.min(remaining);
    if want <= 0.0 {
        return 0.0;
    }

    let slices: Vec<Vec<Vec2>> = others
        .iter()
        .filter_map(|o| o.occupied_rear_slice(safety_gap, step))
        .filter(|s| s.len() >= 2)
        .collect();
    if slices.is_empty() {
        return want;
    }

    let chunk_max = (step * 0.5).max(MIN_CHUNK);
    let mut advanced = 0.0;
    while advanced + MIN_CHUNK < want {
        let chunk = (want - advanced).min(chunk_max);
        let probe = forward_slice(path, s_head + advanced, chunk, step);
        let mut cap = chunk;
        for slice in &slices {
            if let Some(hit) = polyline_first_hit(&probe, slice, epsilon) {
                cap = cap.min(hit_distance(&probe, hit).clamp(0.0, chunk));
            }
        }
        advanced += cap;
        if cap + epsilon < chunk {
            break;
        }
    }
    advanced.clamp(0.0, want)
}

/// Ground-plane polyline of the track from `from` to `from + length`
fn forward_slice(path: &mut LegPath, from: f32, length: f32, step: f32) -> Vec<Vec2> {
    let resolution = step.max(MIN_CHUNK);
    let end = from + length;
    let mut points = vec![ground(path.sample_at(from).position)];
    let mut s = from;
    while s < end {
        s = (s + resolution).min(end);
        points.push(ground(path.sample_at(s).position));
    }
    points
}
