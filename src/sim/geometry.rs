//! 2D segment and polyline intersection on the ground plane
//!
//! Everything the collision layer needs: a probe segment against a blocking
//! segment, and a probe polyline against a blocking polyline. All inputs are
//! ground-plane projections; the constant height axis is dropped before any
//! math runs here.

use glam::Vec2;

/// First contact between a probe polyline and a blocking polyline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineHit {
    /// Index of the probe segment containing the contact
    pub segment: usize,
    /// Fraction along that segment where the contact begins
    pub frac: f32,
}

/// Intersection test between a probe segment and a blocking segment
///
/// Returns the fraction along `a0..a1` where contact begins. Proper crossings
/// report the exact parametric hit; colinear overlaps report the start of the
/// probe segment, the conservative end of the overlap. `eps` is in world
/// units and scales every comparison.
pub fn segment_hit(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2, eps: f32) -> Option<f32> {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let len1 = d1.length();
    let len2 = d2.length();
    if len1 <= eps {
        return None;
    }

    let denom = d1.perp_dot(d2);
    if denom.abs() > eps * len1 * len2 {
        // Proper crossing: solve a0 + t*d1 == b0 + u*d2. The tolerances are
        // eps world units expressed in each segment's parameter space.
        let diff = b0 - a0;
        let t = diff.perp_dot(d2) / denom;
        let u = diff.perp_dot(d1) / denom;
        let tol_t = eps / len1;
        let tol_u = eps / len2;
        if t >= -tol_t && t <= 1.0 + tol_t && u >= -tol_u && u <= 1.0 + tol_u {
            return Some(t.clamp(0.0, 1.0));
        }
        return None;
    }

    // Parallel segments only touch when colinear
    let dir = d1 / len1;
    if (b0 - a0).perp_dot(dir).abs() > eps {
        return None;
    }

    // Overlap interval projected onto the probe direction
    let t0 = (b0 - a0).dot(dir);
    let t1 = (b1 - a0).dot(dir);
    let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    let overlap = hi.min(len1) - lo.max(0.0);
    if overlap > eps {
        // Colinear contact caps at the probe segment start
        Some(0.0)
    } else {
        None
    }
}

/// First contact along `probe` against any segment of `blocker`
///
/// Probe segments are scanned in order; the earliest one with a contact wins,
/// and within it the smallest fraction.
pub fn polyline_first_hit(probe: &[Vec2], blocker: &[Vec2], eps: f32) -> Option<PolylineHit> {
    if probe.len() < 2 || blocker.len() < 2 {
        return None;
    }
    for i in 0..probe.len() - 1 {
        let mut nearest: Option<f32> = None;
        for j in 0..blocker.len() - 1 {
            if let Some(frac) = segment_hit(probe[i], probe[i + 1], blocker[j], blocker[j + 1], eps)
            {
                nearest = Some(match nearest {
                    Some(best) => best.min(frac),
                    None => frac,
                });
            }
        }
        if let Some(frac) = nearest {
            return Some(PolylineHit { segment: i, frac });
        }
    }
    None
}

/// Arc-length distance along `polyline` from its start to a contact
pub fn hit_distance(polyline: &[Vec2], hit: PolylineHit) -> f32 {
    let mut dist = 0.0;
    for (i, pair) in polyline.windows(2).enumerate() {
        let seg = (pair[1] - pair[0]).length();
        if i == hit.segment {
            return dist + seg * hit.frac;
        }
        dist += seg;
    }
    dist
}
