//! Arc-length sampling over a leg's point sequence
//!
//! A leg is an ordered run of world points from the route search. `LegPath`
//! indexes it by traveled distance so the head can be placed at any arc
//! position, in amortized constant time for the mostly-increasing queries a
//! tick loop produces.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::ZERO_LENGTH_NUDGE;

/// Position and facing direction at a point on a path or tape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    /// Unit tangent pointing in the direction of travel
    pub tangent: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            tangent: Vec3::X,
        }
    }
}

/// Arc-length-indexed sampler over the current leg's points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegPath {
    points: Vec<Vec3>,
    /// Cumulative traveled distance per point; `[0] = 0`, last = total length
    cumulative: Vec<f32>,
    /// Bracketing-segment cache for mostly-increasing queries
    #[serde(skip)]
    cursor: usize,
}

impl LegPath {
    /// Build a sampler over `points`; needs at least 2 of them
    ///
    /// Coincident consecutive points are nudged apart so every segment keeps
    /// a usable direction.
    pub fn new(points: &[Vec3]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let mut pts = points.to_vec();
        let mut nudge_dir = Vec3::X;
        for i in 1..pts.len() {
            let prev = pts[i - 1];
            let d = pts[i] - prev;
            if d.length() <= ZERO_LENGTH_NUDGE {
                pts[i] = prev + nudge_dir * ZERO_LENGTH_NUDGE;
            } else {
                nudge_dir = d.normalize_or(Vec3::X);
            }
        }

        let mut cumulative = Vec::with_capacity(pts.len());
        cumulative.push(0.0);
        let mut total = 0.0;
        for i in 1..pts.len() {
            total += (pts[i] - pts[i - 1]).length();
            cumulative.push(total);
        }
        Some(Self {
            points: pts,
            cumulative,
            cursor: 0,
        })
    }

    /// Total leg length in meters
    #[inline]
    pub fn total_length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// First path point
    #[inline]
    pub fn first_point(&self) -> Vec3 {
        self.points.first().copied().unwrap_or(Vec3::ZERO)
    }

    /// Direction of the first segment
    #[inline]
    pub fn start_tangent(&self) -> Vec3 {
        self.segment_dir(0)
    }

    /// Pose at arc position `s`, clamped to the leg's ends
    pub fn sample_at(&mut self, s: f32) -> Pose {
        let n = self.points.len();
        let total = self.total_length();
        if s <= 0.0 {
            return Pose {
                position: self.points[0],
                tangent: self.segment_dir(0),
            };
        }
        if s >= total {
            return Pose {
                position: self.points[n - 1],
                tangent: self.segment_dir(n - 2),
            };
        }

        // Walk the cached cursor to the bracketing segment
        let mut seg = self.cursor.min(n - 2);
        while seg > 0 && s < self.cumulative[seg] {
            seg -= 1;
        }
        while seg + 2 < n && s > self.cumulative[seg + 1] {
            seg += 1;
        }
        self.cursor = seg;

        let span = self.cumulative[seg + 1] - self.cumulative[seg];
        let t = if span > 0.0 {
            (s - self.cumulative[seg]) / span
        } else {
            0.0
        };
        Pose {
            position: self.points[seg].lerp(self.points[seg + 1], t),
            tangent: self.segment_dir(seg),
        }
    }

    fn segment_dir(&self, seg: usize) -> Vec3 {
        let seg = seg.min(self.points.len().saturating_sub(2));
        (self.points[seg + 1] - self.points[seg]).normalize_or(Vec3::X)
    }
}
