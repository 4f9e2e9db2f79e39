//! Geometry on the XZ plane of a Y-up world
//!
//! The navigation mesh builder and the path query engine treat the Y axis as
//! up, so most 2D tests ignore the Y component.

use glam::Vec3;

/// Twice the signed area of the triangle `a`, `b`, `c` projected on the XZ plane.
///
/// Positive when the triangle is clockwise looking down the Y axis.
#[inline]
pub fn tri_area_2d(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let abx = b.x - a.x;
    let abz = b.z - a.z;
    let acx = c.x - a.x;
    let acz = c.z - a.z;
    acx * abz - abx * acz
}

/// Check if two axis-aligned bounding boxes overlap.
#[inline]
pub fn overlap_bounds(amin: Vec3, amax: Vec3, bmin: Vec3, bmax: Vec3) -> bool {
    amin.x <= bmax.x
        && amax.x >= bmin.x
        && amin.y <= bmax.y
        && amax.y >= bmin.y
        && amin.z <= bmax.z
        && amax.z >= bmin.z
}

/// Squared distance between two points on the XZ plane.
#[inline]
pub fn dist_sqr_2d(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    dx * dx + dz * dz
}

/// Returns true if the points are closer than a small tolerance.
#[inline]
pub fn v_equal(a: Vec3, b: Vec3) -> bool {
    const THRESHOLD: f32 = 1.0 / 16384.0;
    a.distance_squared(b) < THRESHOLD * THRESHOLD
}

/// Squared XZ distance from a point to a segment and the parameter of the
/// closest point along the segment.
pub fn dist_point_segment_sqr_2d(p: Vec3, a: Vec3, b: Vec3) -> (f32, f32) {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    let d = dx * dx + dz * dz;
    let t = if d > 0.0 {
        (((p.x - a.x) * dx + (p.z - a.z) * dz) / d).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let qx = a.x + t * dx - p.x;
    let qz = a.z + t * dz - p.z;
    (qx * qx + qz * qz, t)
}

/// Checks if a point is inside a convex or concave polygon on the XZ plane.
pub fn point_in_polygon_2d(p: Vec3, verts: &[Vec3]) -> bool {
    let mut inside = false;
    let n = verts.len();
    if n < 3 {
        return inside;
    }

    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (verts[i], verts[j]);
        if ((vi.z > p.z) != (vj.z > p.z))
            && (p.x < (vj.x - vi.x) * (p.z - vi.z) / (vj.z - vi.z) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Squared distance from a point to every polygon edge together with the
/// edge parameters, plus whether the point is inside the polygon.
///
/// Edge `j` runs from `verts[j]` to `verts[j + 1]`.
pub fn distance_pt_poly_edges_sqr(p: Vec3, verts: &[Vec3]) -> (bool, Vec<f32>, Vec<f32>) {
    let n = verts.len();
    let mut edge_dists = vec![0.0; n];
    let mut edge_ts = vec![0.0; n];
    if n == 0 {
        return (false, edge_dists, edge_ts);
    }

    let mut j = n - 1;
    for i in 0..n {
        let (dist, t) = dist_point_segment_sqr_2d(p, verts[j], verts[i]);
        edge_dists[j] = dist;
        edge_ts[j] = t;
        j = i;
    }

    (point_in_polygon_2d(p, verts), edge_dists, edge_ts)
}

/// Height of the triangle at the XZ location of `p`, if `p` lies over it.
pub fn closest_height_point_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPS: f32 = 1e-6;

    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    // Barycentric coordinates on the XZ plane
    let denom = v0.x * v1.z - v0.z * v1.x;
    if denom.abs() < EPS {
        return None;
    }

    let mut u = v1.z * v2.x - v1.x * v2.z;
    let mut v = v0.x * v2.z - v0.z * v2.x;
    if denom < 0.0 {
        u = -u;
        v = -v;
    }
    let denom = denom.abs();

    if u >= -EPS * denom && v >= -EPS * denom && (u + v) <= denom * (1.0 + EPS) {
        Some(a.y + (v0.y * u + v1.y * v) / denom)
    } else {
        None
    }
}

/// Finds the closest point on segment `a`-`b` to `p` on the XZ plane,
/// interpolating the height along the segment.
pub fn closest_point_on_segment_2d(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let (_, t) = dist_point_segment_sqr_2d(p, a, b);
    a.lerp(b, t)
}
