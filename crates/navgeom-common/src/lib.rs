//! Common utilities and data structures shared by the polygon engine, the
//! navigation mesh builder and the path query engine

mod geometry;
mod math;
mod mesh;
mod planar;
mod rect;
pub mod render;

pub use geometry::*;
pub use math::*;
pub use mesh::*;
pub use planar::*;
pub use rect::RectF;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Represents a 2D position in polygon space
pub type Vec2 = glam::DVec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid input mesh: {0}")]
    InvalidMesh(String),

    #[error("navigation mesh generation failed: {0}")]
    NavMeshGeneration(String),

    #[error("pathfinding failed: {0}")]
    Pathfinding(String),

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for navgeom operations
pub type Result<T> = std::result::Result<T, Error>;
