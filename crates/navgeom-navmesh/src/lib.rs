//! Navigation meshes for game agents
//!
//! [`NavMesh`] bakes a walkable surface from a triangle soup (or from the
//! triangulation of a [`navgeom_polygon::Polygon`]) with the voxel pipeline of
//! `navgeom-recast`, and answers shortest path queries over it with
//! `navgeom-detour`. Failed or impossible queries return an empty path.
//!
//! ```no_run
//! use navgeom_navmesh::{NavMesh, NavMeshConfig};
//! use navgeom_common::Vec2;
//!
//! let config = NavMeshConfig {
//!     cell_size: 0.25,
//!     cell_height: 0.2,
//!     agent_height: 2.0,
//!     agent_radius: 0.5,
//!     agent_max_climb: 0.9,
//!     agent_max_slope: 45.0,
//! };
//!
//! let vertices = [
//!     Vec2::new(0.0, 0.0),
//!     Vec2::new(10.0, 0.0),
//!     Vec2::new(10.0, 10.0),
//!     Vec2::new(0.0, 10.0),
//! ];
//! let mut mesh = NavMesh::new();
//! mesh.build_2d(&vertices, &[[0, 1, 2], [0, 2, 3]], &[1, 1], &config)?;
//! let path = mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), &[]);
//! # Ok::<(), navgeom_common::Error>(())
//! ```

mod config;
mod nav_mesh;

pub use config::NavMeshConfig;
pub use nav_mesh::{
    BuildStats, NavMesh, MAX_PATH_POLYS, MAX_SEARCH_NODES, MAX_WAYPOINTS, QUERY_EXTENT_2D,
    QUERY_EXTENT_3D,
};

pub use navgeom_recast::{TimerCategory, RC_NULL_AREA, RC_WALKABLE_AREA};
