//! Planar geometry on rings of 2D points
//!
//! Rings are open (the closing edge from the last point back to the first is
//! implicit). Orientation follows screen space with y pointing down, so a ring
//! that looks clockwise on screen has a positive [`ring_signed_area`].

use crate::Vec2;

/// Tolerance used for collinearity and coincidence tests in polygon space
pub const PLANAR_EPSILON: f64 = 1e-10;

/// Cross product of `(a - o)` and `(b - o)`.
#[inline]
pub fn cross(o: Vec2, a: Vec2, b: Vec2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Signed area of a ring. Positive when the ring is clockwise in y-down space.
pub fn ring_signed_area(ring: &[Vec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        sum += ring[j].x * ring[i].y - ring[i].x * ring[j].y;
        j = i;
    }
    sum * 0.5
}

/// Unsigned area of a ring
pub fn ring_area(ring: &[Vec2]) -> f64 {
    ring_signed_area(ring).abs()
}

/// Returns true if the ring is clockwise in y-down space
pub fn is_clockwise(ring: &[Vec2]) -> bool {
    ring_signed_area(ring) > 0.0
}

/// Length of the closed boundary of a ring
pub fn ring_perimeter(ring: &[Vec2]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }

    let mut length = 0.0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        length += ring[j].distance(ring[i]);
        j = i;
    }
    length
}

/// Area-weighted centroid of a ring together with its signed area.
///
/// Degenerate rings report the average of their points and zero area.
pub fn ring_centroid(ring: &[Vec2]) -> (Vec2, f64) {
    if ring.is_empty() {
        return (Vec2::ZERO, 0.0);
    }

    let mut area2 = 0.0;
    let mut c = Vec2::ZERO;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[j], ring[i]);
        let f = a.x * b.y - b.x * a.y;
        area2 += f;
        c += (a + b) * f;
        j = i;
    }

    if area2.abs() <= PLANAR_EPSILON {
        let sum = ring.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
        return (sum / ring.len() as f64, 0.0);
    }

    (c / (3.0 * area2), area2 * 0.5)
}

/// Distance from `p` to the segment `a`-`b`
pub fn dist_point_segment(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    dist_point_segment_sqr(p, a, b).sqrt()
}

/// Squared distance from `p` to the segment `a`-`b`
pub fn dist_point_segment_sqr(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len_sqr = ab.length_squared();
    let t = if len_sqr > 0.0 {
        ((p - a).dot(ab) / len_sqr).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance_squared(a + ab * t)
}

/// Returns true if `p` lies on the segment `a`-`b` (within tolerance)
pub fn point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> bool {
    dist_point_segment_sqr(p, a, b) <= PLANAR_EPSILON
}

/// Intersection point of two segments when they cross at a single point.
///
/// Returns the point together with the parameters along each segment.
/// Parallel and collinear segments report `None`.
pub fn segment_intersection(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> Option<(Vec2, f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.perp_dot(db);
    if denom.abs() <= PLANAR_EPSILON {
        return None;
    }

    let diff = b0 - a0;
    let s = diff.perp_dot(db) / denom;
    let t = diff.perp_dot(da) / denom;
    if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
        return None;
    }

    Some((a0 + da * s, s, t))
}

/// Returns true if the two segments share any point, including touching
/// endpoints and collinear overlap.
pub fn segments_intersect(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> bool {
    let d1 = cross(b0, b1, a0);
    let d2 = cross(b0, b1, a1);
    let d3 = cross(a0, a1, b0);
    let d4 = cross(a0, a1, b1);

    if ((d1 > PLANAR_EPSILON && d2 < -PLANAR_EPSILON) || (d1 < -PLANAR_EPSILON && d2 > PLANAR_EPSILON))
        && ((d3 > PLANAR_EPSILON && d4 < -PLANAR_EPSILON)
            || (d3 < -PLANAR_EPSILON && d4 > PLANAR_EPSILON))
    {
        return true;
    }

    point_on_segment(a0, b0, b1)
        || point_on_segment(a1, b0, b1)
        || point_on_segment(b0, a0, a1)
        || point_on_segment(b1, a0, a1)
}

/// Even-odd point in ring test. Points on the boundary may report either side.
pub fn point_in_ring(p: Vec2, ring: &[Vec2]) -> bool {
    let mut inside = false;
    if ring.len() < 3 {
        return inside;
    }

    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (vi, vj) = (ring[i], ring[j]);
        if ((vi.y > p.y) != (vj.y > p.y)) && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Returns true if any two ring edges of `a` and `b` touch or cross
pub fn rings_intersect(a: &[Vec2], b: &[Vec2]) -> bool {
    ring_edges(a).any(|(a0, a1)| ring_edges(b).any(|(b0, b1)| segments_intersect(a0, a1, b0, b1)))
}

/// Iterates the edges of a ring, including the closing edge
pub fn ring_edges(ring: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(size, 0.0),
            Vec2::new(size, size),
            Vec2::new(0.0, size),
        ]
    }

    #[test]
    fn test_square_area_and_orientation() {
        let ring = square(4.0);
        assert_relative_eq!(ring_signed_area(&ring), 16.0);
        assert!(is_clockwise(&ring));

        let reversed: Vec<_> = ring.iter().rev().copied().collect();
        assert_relative_eq!(ring_signed_area(&reversed), -16.0);
        assert_relative_eq!(ring_area(&reversed), 16.0);
    }

    #[test]
    fn test_perimeter_includes_closing_edge() {
        assert_relative_eq!(ring_perimeter(&square(3.0)), 12.0);
    }

    #[test]
    fn test_centroid() {
        let (c, area) = ring_centroid(&square(2.0));
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
        assert_relative_eq!(area, 4.0);
    }

    #[test]
    fn test_segment_intersection() {
        let hit = segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(2.0, 0.0),
        );
        let (p, s, t) = hit.expect("segments cross");
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 1.0);
        assert_relative_eq!(s, 0.5);
        assert_relative_eq!(t, 0.5);

        assert!(segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0)
        )
        .is_none());
    }

    #[test]
    fn test_touching_segments_intersect() {
        assert!(segments_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0)
        ));
        assert!(!segments_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0)
        ));
    }

    #[test]
    fn test_point_in_ring() {
        let ring = square(2.0);
        assert!(point_in_ring(Vec2::new(1.0, 1.0), &ring));
        assert!(!point_in_ring(Vec2::new(3.0, 1.0), &ring));
    }
}
