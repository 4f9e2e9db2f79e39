//! Polygon offsetting (buffering) with miter or round joins
//!
//! Every ring is oriented so that the filled region lies on its left in
//! y-up terms, then each edge is pushed to its right by the buffer distance.
//! Corners where the pushed edges move apart get a join, corners where they
//! overlap are routed through the original vertex. The resulting raw ring is
//! split at its self-intersections and only loops that keep the ring's
//! winding and stay at least the buffer distance away from the input survive.

use std::f64::consts::PI;

use navgeom_common::{
    dist_point_segment_sqr, point_in_ring, ring_edges, ring_signed_area, rings_intersect,
    segment_intersection, Vec2, PLANAR_EPSILON,
};

/// Miter length limit, as a multiple of the buffer distance
pub const MITER_LIMIT: f64 = 5.0;

/// Largest angle covered by a single segment of a round join
pub const ROUND_JOIN_STEP: f64 = PI / 32.0;

/// How two offset edges are connected at a corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStyle {
    /// Extend both edges until they meet, beveled beyond [`MITER_LIMIT`]
    Miter,
    /// Circular arc around the original vertex
    Round,
}

/// Rings of a buffered polygon, all clockwise in y-down space
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedRings {
    pub outer: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
}

/// Offsets a polygon by `distance`, outward when positive.
///
/// Returns `None` when the result is empty, splits into several polygons, or
/// when grown holes would cut through the outer boundary or each other.
pub fn buffer_rings(
    outer: &[Vec2],
    holes: &[Vec<Vec2>],
    distance: f64,
    join: JoinStyle,
) -> Option<BufferedRings> {
    if !distance.is_finite() {
        return None;
    }

    let outer = clean_ring(&oriented(outer, true));
    if outer.len() < 3 {
        return None;
    }
    let holes: Vec<Vec<Vec2>> = holes
        .iter()
        .map(|h| clean_ring(&oriented(h, false)))
        .filter(|h| h.len() >= 3)
        .collect();

    if distance.abs() <= PLANAR_EPSILON {
        return Some(BufferedRings {
            outer,
            holes: holes.into_iter().map(|h| oriented(&h, true)).collect(),
        });
    }

    let sources: Vec<&[Vec2]> = std::iter::once(outer.as_slice())
        .chain(holes.iter().map(Vec::as_slice))
        .collect();

    let mut outer_loops = offset_ring(&outer, distance, join, 1.0, &sources);
    if outer_loops.len() != 1 {
        log::debug!(
            "buffer by {} produced {} outer rings",
            distance,
            outer_loops.len()
        );
        return None;
    }
    let new_outer = outer_loops.remove(0);

    let mut new_holes: Vec<Vec<Vec2>> = Vec::new();
    for hole in &holes {
        new_holes.extend(offset_ring(hole, distance, join, -1.0, &sources));
    }

    for (i, hole) in new_holes.iter().enumerate() {
        if rings_intersect(&new_outer, hole) || !point_in_ring(hole[0], &new_outer) {
            log::debug!("buffered hole {} leaves the outer ring", i);
            return None;
        }
        for other in &new_holes[i + 1..] {
            if rings_intersect(hole, other) || point_in_ring(hole[0], other) || point_in_ring(other[0], hole) {
                log::debug!("buffered holes overlap");
                return None;
            }
        }
    }

    Some(BufferedRings {
        outer: new_outer,
        holes: new_holes.into_iter().map(|h| oriented(&h, true)).collect(),
    })
}

/// Returns the ring with positive signed area when `positive` is set,
/// negative otherwise
fn oriented(ring: &[Vec2], positive: bool) -> Vec<Vec2> {
    let mut ring = ring.to_vec();
    if (ring_signed_area(&ring) > 0.0) != positive {
        ring.reverse();
    }
    ring
}

/// Offsets one ring and returns the surviving loops.
///
/// `winding` is the sign of the ring's signed area; loops with the opposite
/// winding are discarded.
fn offset_ring(
    ring: &[Vec2],
    distance: f64,
    join: JoinStyle,
    winding: f64,
    sources: &[&[Vec2]],
) -> Vec<Vec<Vec2>> {
    let raw = raw_offset(ring, distance, join);
    let mut loops = Vec::new();
    split_loops(&raw, winding, &mut loops);

    let tolerance = distance.abs() * 1e-6 + 1e-9;
    let min_dist_sqr = (distance.abs() - tolerance).max(0.0).powi(2);

    loops.retain(|l| {
        ring_signed_area(l).abs() > PLANAR_EPSILON
            && l.iter().all(|p| distance_to_rings_sqr(*p, sources) >= min_dist_sqr)
    });
    loops
}

fn distance_to_rings_sqr(p: Vec2, rings: &[&[Vec2]]) -> f64 {
    rings
        .iter()
        .flat_map(|r| ring_edges(r))
        .map(|(a, b)| dist_point_segment_sqr(p, a, b))
        .fold(f64::INFINITY, f64::min)
}

/// Builds the untrimmed offset ring
fn raw_offset(ring: &[Vec2], distance: f64, join: JoinStyle) -> Vec<Vec2> {
    let n = ring.len();
    let dirs: Vec<Vec2> = (0..n)
        .map(|i| (ring[(i + 1) % n] - ring[i]).normalize_or_zero())
        .collect();
    // Right-hand normals scaled by the distance
    let normals: Vec<Vec2> = dirs.iter().map(|d| Vec2::new(d.y, -d.x) * distance).collect();

    let mut raw = Vec::with_capacity(n * 4);
    for i in 0..n {
        let prev = (i + n - 1) % n;
        let p = ring[i];
        let a = p + normals[prev];
        let b = p + normals[i];
        let turn = dirs[prev].perp_dot(dirs[i]);
        let dot = dirs[prev].dot(dirs[i]);

        if turn.abs() <= PLANAR_EPSILON && dot > 0.0 {
            // Straight continuation
            raw.push(a);
        } else if turn * distance > 0.0 || (turn.abs() <= PLANAR_EPSILON && dot < 0.0) {
            push_join(&mut raw, p, a, b, dirs[prev], dirs[i], distance, turn, join);
        } else {
            // The offset edges overlap here
            let prev_start = ring[prev] + normals[prev];
            let next_end = ring[(i + 1) % n] + normals[i];
            match segment_intersection(prev_start, a, b, next_end) {
                Some((q, _, _)) => raw.push(q),
                None => {
                    raw.push(a);
                    raw.push(p);
                    raw.push(b);
                }
            }
        }
    }
    raw
}

#[allow(clippy::too_many_arguments)]
fn push_join(
    raw: &mut Vec<Vec2>,
    p: Vec2,
    a: Vec2,
    b: Vec2,
    dir_prev: Vec2,
    dir_next: Vec2,
    distance: f64,
    turn: f64,
    join: JoinStyle,
) {
    match join {
        JoinStyle::Miter => {
            let denom = 1.0 + dir_prev.dot(dir_next);
            if denom > PLANAR_EPSILON {
                let miter = ((a - p) + (b - p)) / denom;
                if miter.length() <= MITER_LIMIT * distance.abs() {
                    raw.push(p + miter);
                    return;
                }
            }
            raw.push(a);
            raw.push(b);
        }
        JoinStyle::Round => {
            let va = a - p;
            let vb = b - p;
            let mut sweep = va.perp_dot(vb).atan2(va.dot(vb));
            // The arc turns with the edges; a full reversal wraps around the
            // far side of the vertex
            let side = if turn.abs() > PLANAR_EPSILON { turn } else { distance };
            if sweep * side < 0.0 || (sweep.abs() >= PI - PLANAR_EPSILON && side < 0.0) {
                sweep = -sweep.signum() * (2.0 * PI - sweep.abs());
            }

            let steps = ((sweep.abs() / ROUND_JOIN_STEP).ceil() as usize).max(1);
            let start = va.y.atan2(va.x);
            let radius = va.length();
            raw.push(a);
            for k in 1..steps {
                let angle = start + sweep * k as f64 / steps as f64;
                raw.push(p + Vec2::new(angle.cos(), angle.sin()) * radius);
            }
            raw.push(b);
        }
    }
}

/// Removes consecutive duplicates and collinear points
fn clean_ring(ring: &[Vec2]) -> Vec<Vec2> {
    let tol_sqr = PLANAR_EPSILON * PLANAR_EPSILON;
    let mut deduped: Vec<Vec2> = Vec::with_capacity(ring.len());
    for &p in ring {
        if deduped.last().is_some_and(|last| last.distance_squared(p) <= tol_sqr) {
            continue;
        }
        deduped.push(p);
    }
    while deduped.len() > 1 && deduped[0].distance_squared(deduped[deduped.len() - 1]) <= tol_sqr {
        deduped.pop();
    }

    let mut changed = true;
    while changed && deduped.len() >= 3 {
        changed = false;
        let n = deduped.len();
        for i in 0..n {
            let prev = deduped[(i + n - 1) % n];
            let next = deduped[(i + 1) % n];
            if (deduped[i] - prev).perp_dot(next - deduped[i]).abs() <= PLANAR_EPSILON {
                deduped.remove(i);
                changed = true;
                break;
            }
        }
    }
    deduped
}

/// First crossing between two non-adjacent edges, ignoring contacts where
/// both edges only touch at their endpoints
fn first_self_intersection(ring: &[Vec2]) -> Option<(usize, usize, Vec2)> {
    let n = ring.len();
    if n < 4 {
        return None;
    }

    let eps = 1e-9;
    for i in 0..n {
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let hit = segment_intersection(ring[i], ring[(i + 1) % n], ring[j], ring[(j + 1) % n]);
            if let Some((q, s, t)) = hit {
                let s_end = s < eps || s > 1.0 - eps;
                let t_end = t < eps || t > 1.0 - eps;
                if s_end && t_end {
                    continue;
                }
                return Some((i, j, q));
            }
        }
    }
    None
}

/// Recursively splits a ring at its self-intersections and collects the
/// simple loops whose winding matches `winding`
fn split_loops(ring: &[Vec2], winding: f64, out: &mut Vec<Vec<Vec2>>) {
    let ring = clean_ring(ring);
    if ring.len() < 3 {
        return;
    }

    match first_self_intersection(&ring) {
        None => {
            if ring_signed_area(&ring) * winding > 0.0 {
                out.push(ring);
            }
        }
        Some((i, j, q)) => {
            let n = ring.len();
            let mut a = Vec::with_capacity(j - i + 1);
            a.push(q);
            a.extend_from_slice(&ring[i + 1..=j]);

            let mut b = Vec::with_capacity(n - (j - i) + 1);
            b.push(q);
            b.extend_from_slice(&ring[j + 1..]);
            b.extend_from_slice(&ring[..=i]);

            split_loops(&a, winding, out);
            split_loops(&b, winding, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use navgeom_common::ring_area;

    fn square(min: f64, max: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(min, min),
            Vec2::new(max, min),
            Vec2::new(max, max),
            Vec2::new(min, max),
        ]
    }

    #[test]
    fn test_miter_grow_square() {
        let rings = buffer_rings(&square(0.0, 10.0), &[], 1.0, JoinStyle::Miter).expect("buffered");
        assert_eq!(rings.outer.len(), 4);
        assert_relative_eq!(ring_area(&rings.outer), 144.0, epsilon = 1e-9);
        assert!(ring_signed_area(&rings.outer) > 0.0);
    }

    #[test]
    fn test_miter_shrink_square() {
        let rings = buffer_rings(&square(0.0, 10.0), &[], -1.0, JoinStyle::Miter).expect("buffered");
        assert_relative_eq!(ring_area(&rings.outer), 64.0, epsilon = 1e-9);
    }

    #[test]
    fn test_round_grow_square() {
        let rings = buffer_rings(&square(0.0, 10.0), &[], 1.0, JoinStyle::Round).expect("buffered");
        let expected = 100.0 + 40.0 + PI;
        assert_relative_eq!(ring_area(&rings.outer), expected, epsilon = 0.05);
    }

    #[test]
    fn test_collapse_is_none() {
        assert!(buffer_rings(&square(0.0, 10.0), &[], -6.0, JoinStyle::Miter).is_none());
    }

    #[test]
    fn test_concave_shape_grows() {
        // L shape
        let ring = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 4.0),
            Vec2::new(0.0, 4.0),
        ];
        let rings = buffer_rings(&ring, &[], 0.5, JoinStyle::Miter).expect("buffered");
        // 5x5 square minus the 2x2 notch
        assert_relative_eq!(ring_area(&rings.outer), 21.0, epsilon = 1e-9);
    }

    #[test]
    fn test_split_into_two_is_none() {
        // Two squares joined by a thin neck
        let ring = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 1.8),
            Vec2::new(6.0, 1.8),
            Vec2::new(6.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 4.0),
            Vec2::new(6.0, 4.0),
            Vec2::new(6.0, 2.2),
            Vec2::new(4.0, 2.2),
            Vec2::new(4.0, 4.0),
            Vec2::new(0.0, 4.0),
        ];
        assert!(buffer_rings(&ring, &[], -0.5, JoinStyle::Miter).is_none());
        assert!(buffer_rings(&ring, &[], -0.1, JoinStyle::Miter).is_some());
    }

    #[test]
    fn test_hole_shrinks_when_growing() {
        let rings = buffer_rings(&square(0.0, 10.0), &[square(4.0, 6.0)], 0.5, JoinStyle::Miter)
            .expect("buffered");
        assert_eq!(rings.holes.len(), 1);
        assert_relative_eq!(ring_area(&rings.holes[0]), 1.0, epsilon = 1e-9);

        let rings = buffer_rings(&square(0.0, 10.0), &[square(4.0, 6.0)], 1.5, JoinStyle::Miter)
            .expect("buffered");
        assert!(rings.holes.is_empty());
    }

    #[test]
    fn test_hole_reaching_outer_is_none() {
        assert!(
            buffer_rings(&square(0.0, 10.0), &[square(2.0, 8.0)], -1.5, JoinStyle::Miter).is_none()
        );
    }
}
