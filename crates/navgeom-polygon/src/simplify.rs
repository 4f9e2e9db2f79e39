//! Douglas-Peucker line simplification

use navgeom_common::{dist_point_segment_sqr, Vec2};

/// Simplifies an open polyline, keeping both endpoints.
///
/// Points closer than `max_distance` to the simplified line are dropped.
/// A negative or non-finite tolerance returns the input unchanged.
pub fn simplify_polyline(points: &[Vec2], max_distance: f64) -> Vec<Vec2> {
    if points.len() < 3 || !max_distance.is_finite() || max_distance < 0.0 {
        return points.to_vec();
    }

    let threshold = max_distance * max_distance;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }

        let (a, b) = (points[first], points[last]);
        let mut max_dist = 0.0;
        let mut max_index = first;
        for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
            let d = dist_point_segment_sqr(*p, a, b);
            if d > max_dist {
                max_dist = d;
                max_index = i;
            }
        }

        if max_dist > threshold {
            keep[max_index] = true;
            stack.push((first, max_index));
            stack.push((max_index, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplifies a closed ring.
///
/// The ring is closed with a copy of its first point, simplified as a
/// polyline, and the closing copy is dropped again as long as more than three
/// points remain.
pub fn simplify_ring(ring: &[Vec2], max_distance: f64) -> Vec<Vec2> {
    simplify_ring_by(ring, |closed| simplify_polyline(closed, max_distance))
}

/// [`simplify_ring`] with a caller supplied polyline simplifier
pub(crate) fn simplify_ring_by<F>(ring: &[Vec2], simplify: F) -> Vec<Vec2>
where
    F: FnOnce(&[Vec2]) -> Vec<Vec2>,
{
    let Some(first) = ring.first() else {
        return Vec::new();
    };

    let mut closed = Vec::with_capacity(ring.len() + 1);
    closed.extend_from_slice(ring);
    closed.push(*first);

    let mut simplified = simplify(&closed);
    if simplified.len() > 3 {
        simplified.pop();
    }
    simplified
}
