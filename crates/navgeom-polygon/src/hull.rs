//! Convex hull by Andrew's monotone chain

use navgeom_common::{cross, Vec2, PLANAR_EPSILON};

/// Convex hull of a point set as a ring without collinear points.
///
/// The ring starts at the lowest-x point and is clockwise in y-down space.
/// Fewer than three distinct, non-collinear points yield the distinct points
/// that were found (possibly fewer than three).
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = points.iter().copied().filter(|p| p.is_finite()).collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    // Lower then upper chain
    let mut hull: Vec<Vec2> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= PLANAR_EPSILON {
            hull.pop();
        }
        hull.push(p);
    }

    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= PLANAR_EPSILON
        {
            hull.pop();
        }
        hull.push(p);
    }

    // The last point repeats the first
    hull.pop();

    hull
}
