//! Small numeric helpers for 3D vectors

use glam::Vec3;

/// Square of a value
#[inline]
pub fn sqr<T: std::ops::Mul<Output = T> + Copy>(x: T) -> T {
    x * x
}

/// Calculates the axis-aligned bounds of a set of points.
///
/// Returns `None` when the slice is empty.
pub fn calc_bounds(vertices: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let first = *vertices.first()?;
    Some(
        vertices
            .iter()
            .fold((first, first), |(bmin, bmax), v| (bmin.min(*v), bmax.max(*v))),
    )
}

/// Unit normal of a triangle, or zero for a degenerate triangle
#[inline]
pub fn tri_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    (v1 - v0).cross(v2 - v0).normalize_or_zero()
}

/// Find the closest point on a triangle to a given point
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    // Check if P in vertex region outside A
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a; // barycentric coordinates (1,0,0)
    }

    // Check if P in vertex region outside B
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b; // barycentric coordinates (0,1,0)
    }

    // Check if P in edge region of AB, if so return projection of P onto AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v; // barycentric coordinates (1-v,v,0)
    }

    // Check if P in vertex region outside C
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c; // barycentric coordinates (0,0,1)
    }

    // Check if P in edge region of AC, if so return projection of P onto AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w; // barycentric coordinates (1-w,0,w)
    }

    // Check if P in edge region of BC, if so return projection of P onto BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w; // barycentric coordinates (0,1-w,w)
    }

    // P inside face region. Compute Q through its barycentric coordinates (u,v,w)
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w // = u*a + v*b + w*c, u = va * denom = 1.0-v-w
}

/// Calculate the squared distance from a point to a triangle
pub fn distance_point_triangle_squared(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let closest = closest_point_on_triangle(p, a, b, c);
    (p - closest).length_squared()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_bounds() {
        let verts = [
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 4.0, 0.0),
            Vec3::new(0.5, 0.0, 7.0),
        ];
        let (bmin, bmax) = calc_bounds(&verts).expect("non-empty");
        assert_eq!(bmin, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bmax, Vec3::new(1.0, 4.0, 7.0));
        assert!(calc_bounds(&[]).is_none());
    }

    #[test]
    fn test_closest_point_on_triangle() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 0.0, 1.0);

        let inside = closest_point_on_triangle(Vec3::new(0.25, 1.0, 0.25), a, b, c);
        assert!((inside - Vec3::new(0.25, 0.0, 0.25)).length() < 1e-6);

        let corner = closest_point_on_triangle(Vec3::new(-1.0, 0.0, -1.0), a, b, c);
        assert_eq!(corner, a);
        assert!((distance_point_triangle_squared(Vec3::new(2.0, 0.0, 0.0), a, b, c) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tri_normal() {
        let n = tri_normal(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        assert!((n - Vec3::Y).length() < 1e-6);
    }
}
