//! Polygon validity checks run before construction

use navgeom_common::{
    cross, point_in_ring, ring_edges, ring_signed_area, rings_intersect, segments_intersect, Vec2,
    PLANAR_EPSILON,
};

/// Reason a set of rings does not form a valid polygon
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonFailure {
    #[error("ring has fewer than 3 points")]
    TooFewPoints,

    #[error("ring contains a non-finite coordinate")]
    NonFinite,

    #[error("ring has consecutive duplicate points")]
    DuplicatePoints,

    #[error("ring folds back on itself (spike)")]
    Spike,

    #[error("ring encloses no area")]
    ZeroArea,

    #[error("ring edges intersect each other")]
    SelfIntersection,

    #[error("hole is not inside the outer ring")]
    HoleOutsideOuter,

    #[error("holes overlap or are nested")]
    HolesIntersect,
}

/// Checks that `outer` and `holes` describe a simple polygon with holes.
///
/// Holes with fewer than 3 points are ignored, matching the construction
/// which drops them.
pub fn validate(outer: &[Vec2], holes: &[Vec<Vec2>]) -> Result<(), PolygonFailure> {
    validate_ring(outer)?;

    let holes: Vec<&[Vec2]> = holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(Vec::as_slice)
        .collect();

    for hole in &holes {
        validate_ring(hole)?;

        if rings_intersect(outer, hole) || !hole.iter().all(|p| point_in_ring(*p, outer)) {
            return Err(PolygonFailure::HoleOutsideOuter);
        }
    }

    for (i, a) in holes.iter().enumerate() {
        for b in &holes[i + 1..] {
            if rings_intersect(a, b) || point_in_ring(a[0], b) || point_in_ring(b[0], a) {
                return Err(PolygonFailure::HolesIntersect);
            }
        }
    }

    Ok(())
}

/// Checks a single ring in isolation
pub fn validate_ring(ring: &[Vec2]) -> Result<(), PolygonFailure> {
    let n = ring.len();
    if n < 3 {
        return Err(PolygonFailure::TooFewPoints);
    }

    if ring.iter().any(|p| !p.is_finite()) {
        return Err(PolygonFailure::NonFinite);
    }

    for i in 0..n {
        if ring[i] == ring[(i + 1) % n] {
            return Err(PolygonFailure::DuplicatePoints);
        }
    }

    for i in 0..n {
        let prev = ring[(i + n - 1) % n];
        let cur = ring[i];
        let next = ring[(i + 1) % n];
        if cross(cur, prev, next).abs() <= PLANAR_EPSILON && (prev - cur).dot(next - cur) > 0.0 {
            return Err(PolygonFailure::Spike);
        }
    }

    if ring_signed_area(ring).abs() <= PLANAR_EPSILON {
        return Err(PolygonFailure::ZeroArea);
    }

    if has_self_intersection(ring) {
        return Err(PolygonFailure::SelfIntersection);
    }

    Ok(())
}

/// Checks every pair of non-adjacent edges for contact
fn has_self_intersection(ring: &[Vec2]) -> bool {
    let n = ring.len();
    let edges: Vec<(Vec2, Vec2)> = ring_edges(ring).collect();

    for i in 0..n {
        for j in i + 1..n {
            // Adjacent edges share an endpoint
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (a0, a1) = edges[i];
            let (b0, b1) = edges[j];
            if segments_intersect(a0, a1, b0, b1) {
                return true;
            }
        }
    }

    false
}
