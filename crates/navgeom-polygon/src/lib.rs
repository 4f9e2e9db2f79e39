//! Planar polygons with holes
//!
//! A [`Polygon`] owns an outer ring, its holes and a triangulation of the
//! filled region. Derived shapes (convex hull, buffers, simplified outlines)
//! are computed through a [`PlanarKernel`] and returned as new polygons.

mod buffer;
mod hull;
mod kernel;
mod polygon;
mod simplify;
mod triangulate;
mod validate;

pub use buffer::{buffer_rings, BufferedRings, JoinStyle, MITER_LIMIT, ROUND_JOIN_STEP};
pub use hull::convex_hull;
pub use kernel::{BuiltinKernel, PlanarKernel};
pub use polygon::Polygon;
pub use simplify::{simplify_polyline, simplify_ring};
pub use triangulate::{triangulate, Triangulation};
pub use validate::{validate, validate_ring, PolygonFailure};

pub use navgeom_common::{RectF, Vec2};
