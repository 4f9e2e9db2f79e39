//! Exact orientation tests on grid vertices
//!
//! Contour and polygon vertices live on the voxel grid as `[x, y, z, flags]`.
//! Only `x` and `z` take part in these tests.

pub(crate) type GridVertex = [i32; 4];

pub(crate) fn prev(i: usize, n: usize) -> usize {
    if i == 0 {
        n - 1
    } else {
        i - 1
    }
}

pub(crate) fn next(i: usize, n: usize) -> usize {
    if i + 1 >= n {
        0
    } else {
        i + 1
    }
}

/// Twice the signed area of triangle `abc`
pub(crate) fn area2(a: &GridVertex, b: &GridVertex, c: &GridVertex) -> i64 {
    (b[0] - a[0]) as i64 * (c[2] - a[2]) as i64 - (c[0] - a[0]) as i64 * (b[2] - a[2]) as i64
}

/// `c` is strictly left of the directed line `ab`
pub(crate) fn left(a: &GridVertex, b: &GridVertex, c: &GridVertex) -> bool {
    area2(a, b, c) < 0
}

pub(crate) fn left_on(a: &GridVertex, b: &GridVertex, c: &GridVertex) -> bool {
    area2(a, b, c) <= 0
}

pub(crate) fn collinear(a: &GridVertex, b: &GridVertex, c: &GridVertex) -> bool {
    area2(a, b, c) == 0
}

/// Same position on the grid plane
pub(crate) fn vequal(a: &GridVertex, b: &GridVertex) -> bool {
    a[0] == b[0] && a[2] == b[2]
}

/// Proper intersection: the segments cross at a point interior to both
pub(crate) fn intersect_prop(a: &GridVertex, b: &GridVertex, c: &GridVertex, d: &GridVertex) -> bool {
    if collinear(a, b, c) || collinear(a, b, d) || collinear(c, d, a) || collinear(c, d, b) {
        return false;
    }
    (left(a, b, c) ^ left(a, b, d)) && (left(c, d, a) ^ left(c, d, b))
}

/// `c` lies on the closed segment `ab`
fn between(a: &GridVertex, b: &GridVertex, c: &GridVertex) -> bool {
    if !collinear(a, b, c) {
        return false;
    }
    let axis = if a[0] != b[0] { 0 } else { 2 };
    (a[axis] <= c[axis] && c[axis] <= b[axis]) || (a[axis] >= c[axis] && c[axis] >= b[axis])
}

/// Segments `ab` and `cd` intersect properly or improperly
pub(crate) fn intersect(a: &GridVertex, b: &GridVertex, c: &GridVertex, d: &GridVertex) -> bool {
    intersect_prop(a, b, c, d) || between(a, b, c) || between(a, b, d) || between(c, d, a) || between(c, d, b)
}

/// Squared distance from `(x, z)` to the segment `p..q`
pub(crate) fn distance_pt_seg_sqr(x: i32, z: i32, (px, pz): (i32, i32), (qx, qz): (i32, i32)) -> f32 {
    let pqx = (qx - px) as f32;
    let pqz = (qz - pz) as f32;
    let dx = (x - px) as f32;
    let dz = (z - pz) as f32;
    let d = pqx * pqx + pqz * pqz;
    let mut t = pqx * dx + pqz * dz;
    if d > 0.0 {
        t /= d;
    }
    let t = t.clamp(0.0, 1.0);

    let dx = px as f32 + t * pqx - x as f32;
    let dz = pz as f32 + t * pqz - z as f32;
    dx * dx + dz * dz
}
