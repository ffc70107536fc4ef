//! Append-only record of where a train's head has been
//!
//! Trailing cars are posed by walking backward along this record, so they
//! retrace the head's exact track instead of cutting corners toward it. The
//! tape only ever grows at the head end; stale history is trimmed from the
//! front once the cars no longer reach it, with cumulative distances rebased
//! so they stay small.
//!
//! Before the head has moved there is no history to walk, so the first leg
//! reserves a straight-line prefix behind the start point. The prefix is
//! virtual (no stored points) and its length only ever grows.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::TAPE_DEDUP_EPS;
use crate::sim::path::Pose;

/// Direction used when no segment yields a usable one
const FALLBACK_AXIS: Vec3 = Vec3::X;

/// Result of walking `back` meters from the newest tape point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackSample {
    pub pose: Pose,
    /// Total walkable distance behind the head, recorded plus prefix
    pub available: f32,
    /// Whether the requested distance fit inside `available`
    pub covered: bool,
}

/// Head trajectory record with a virtual straight-line prefix
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailTape {
    points: Vec<Vec3>,
    /// Cumulative distance per point, rebased so `[0] = 0` after trims
    cumulative: Vec<f32>,
    /// Unit direction pointing behind the first recorded point
    prefix_dir: Vec3,
    prefix_len: f32,
}

impl TrailTape {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Recorded distance between the oldest and newest points
    #[inline]
    pub fn span(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn prefix_length(&self) -> f32 {
        self.prefix_len
    }

    /// Total distance walkable behind the head
    #[inline]
    pub fn coverage(&self) -> f32 {
        self.span() + self.prefix_len
    }

    #[inline]
    pub fn newest_point(&self) -> Option<Vec3> {
        self.points.last().copied()
    }

    /// Reserve a straight-line prefix behind `head` pointing along `behind`
    ///
    /// Seeds the tape with `head` when it is empty; the direction is fixed at
    /// that moment and later calls can only lengthen the reservation.
    pub fn ensure_prefix(&mut self, head: Vec3, behind: Vec3, length: f32) {
        if self.points.is_empty() {
            self.points.push(head);
            self.cumulative.push(0.0);
            self.prefix_dir = behind.normalize_or(-FALLBACK_AXIS);
        }
        self.prefix_len = self.prefix_len.max(length.max(0.0));
    }

    /// Append a head position, skipping points too close to the newest one
    pub fn append_point(&mut self, p: Vec3) {
        match self.points.last() {
            Some(&last) => {
                let d = (p - last).length();
                if d > TAPE_DEDUP_EPS {
                    let total = self.span() + d;
                    self.points.push(p);
                    self.cumulative.push(total);
                }
            }
            None => {
                self.points.push(p);
                self.cumulative.push(0.0);
            }
        }
    }

    /// Record one tick of head travel
    ///
    /// When `from` is not the newest point (a new leg starting elsewhere) the
    /// jump is recorded as a segment too, keeping the walk connected.
    pub fn append_segment(&mut self, from: Vec3, to: Vec3) {
        self.append_point(from);
        self.append_point(to);
    }

    /// Drop front history beyond `max_len`, keeping at least one segment
    pub fn trim_to_capacity(&mut self, max_len: f32) {
        let n = self.points.len();
        if n < 2 {
            return;
        }
        let newest = self.span();
        let cut = self
            .cumulative
            .partition_point(|&c| newest - c > max_len)
            .min(n - 2);
        if cut == 0 {
            return;
        }
        let base = self.cumulative[cut];
        self.points.drain(..cut);
        self.cumulative.drain(..cut);
        for c in &mut self.cumulative {
            *c -= base;
        }
    }

    /// Pose `back` meters behind the newest point, walking the record and
    /// then the prefix; clamps at the far end of the prefix
    pub fn sample_back(&self, back: f32) -> BackSample {
        if self.points.is_empty() {
            return BackSample {
                pose: Pose::default(),
                available: 0.0,
                covered: false,
            };
        }
        let back = back.max(0.0);
        let span = self.span();
        let available = span + self.prefix_len;
        let covered = back <= available;

        let pose = if back <= span && self.points.len() >= 2 {
            self.pose_at_back(back)
        } else {
            let over = (back - span).max(0.0).min(self.prefix_len);
            let behind = if self.prefix_dir == Vec3::ZERO {
                -FALLBACK_AXIS
            } else {
                self.prefix_dir
            };
            Pose {
                position: self.points[0] + behind * over,
                tangent: -behind,
            }
        };
        BackSample {
            pose,
            available,
            covered,
        }
    }

    fn pose_at_back(&self, back: f32) -> Pose {
        let n = self.points.len();
        let target = (self.span() - back).max(0.0);
        let seg = self
            .cumulative
            .partition_point(|&c| c <= target)
            .saturating_sub(1)
            .min(n - 2);
        let span = self.cumulative[seg + 1] - self.cumulative[seg];
        let t = if span > 0.0 {
            (target - self.cumulative[seg]) / span
        } else {
            0.0
        };
        Pose {
            position: self.points[seg].lerp(self.points[seg + 1], t),
            tangent: self.segment_dir(seg),
        }
    }

    fn segment_dir(&self, seg: usize) -> Vec3 {
        let n = self.points.len();
        for idx in [Some(seg), Some(seg + 1), seg.checked_sub(1)]
            .into_iter()
            .flatten()
        {
            if idx + 1 >= n {
                continue;
            }
            let d = self.points[idx + 1] - self.points[idx];
            if d.length_squared() > 0.0 {
                return d.normalize_or(FALLBACK_AXIS);
            }
        }
        FALLBACK_AXIS
    }
}
