//! Pluggable planar geometry kernel
//!
//! [`Polygon`](crate::Polygon) delegates hull, buffer and simplification to a
//! kernel so that a different computational geometry backend can be swapped
//! in without touching the polygon engine.

use navgeom_common::Vec2;

use crate::buffer::{buffer_rings, BufferedRings, JoinStyle};
use crate::hull::convex_hull;
use crate::simplify::simplify_polyline;

/// Geometry capabilities required by the polygon engine
pub trait PlanarKernel {
    /// Convex hull of a point set, as an open ring
    fn convex_hull(&self, points: &[Vec2]) -> Vec<Vec2>;

    /// Offsets a polygon; `None` unless the result is exactly one polygon
    fn buffer(
        &self,
        outer: &[Vec2],
        holes: &[Vec<Vec2>],
        distance: f64,
        join: JoinStyle,
    ) -> Option<BufferedRings>;

    /// Simplifies an open polyline, keeping both endpoints
    fn simplify(&self, polyline: &[Vec2], max_distance: f64) -> Vec<Vec2>;
}

/// Kernel backed by the algorithms in this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinKernel;

impl PlanarKernel for BuiltinKernel {
    fn convex_hull(&self, points: &[Vec2]) -> Vec<Vec2> {
        convex_hull(points)
    }

    fn buffer(
        &self,
        outer: &[Vec2],
        holes: &[Vec<Vec2>],
        distance: f64,
        join: JoinStyle,
    ) -> Option<BufferedRings> {
        buffer_rings(outer, holes, distance, join)
    }

    fn simplify(&self, polyline: &[Vec2], max_distance: f64) -> Vec<Vec2> {
        simplify_polyline(polyline, max_distance)
    }
}
