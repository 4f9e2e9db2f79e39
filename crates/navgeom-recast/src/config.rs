//! Configuration for the Recast navigation mesh generation process

use glam::Vec3;

use navgeom_common::{Error, Result};

use crate::regions::RegionPartition;

/// Build parameters in voxel units
///
/// Use [`RecastConfig::from_agent`] to derive the voxel values from world
/// space agent dimensions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RecastConfig {
    /// Cells along x
    pub width: i32,
    /// Cells along z
    pub height: i32,

    /// Cell size on the XZ plane
    pub cs: f32,
    /// Cell height along y
    pub ch: f32,

    pub bmin: Vec3,
    pub bmax: Vec3,

    /// Steepest walkable slope in degrees
    pub walkable_slope_angle: f32,
    /// Minimum clearance in cell heights
    pub walkable_height: i32,
    /// Maximum step height in cell heights
    pub walkable_climb: i32,
    /// Erosion radius in cells
    pub walkable_radius: i32,

    /// Longest contour edge along walls in cells, 0 for no limit
    pub max_edge_len: i32,
    /// Allowed contour deviation from the raw outline, in cells
    pub max_simplification_error: f32,
    /// Smallest isolated region kept, in spans
    pub min_region_area: i32,
    /// Regions up to this many spans are merged into neighbors
    pub merge_region_area: i32,

    pub max_vertices_per_polygon: i32,

    /// Detail sampling distance in world units, 0 disables sampling
    pub detail_sample_dist: f32,
    /// Allowed detail surface error in world units
    pub detail_sample_max_error: f32,

    /// Cells of padding that belong to no region
    pub border_size: i32,

    pub region_partition: RegionPartition,
}

impl Default for RecastConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            cs: 0.3,
            ch: 0.2,
            bmin: Vec3::ZERO,
            bmax: Vec3::ZERO,
            walkable_slope_angle: 45.0,
            walkable_height: 10,
            walkable_climb: 4,
            walkable_radius: 2,
            max_edge_len: 40,
            max_simplification_error: 1.3,
            min_region_area: 64,
            merge_region_area: 400,
            max_vertices_per_polygon: 6,
            detail_sample_dist: 1.8,
            detail_sample_max_error: 0.2,
            border_size: 0,
            region_partition: RegionPartition::Watershed,
        }
    }
}

impl RecastConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives voxel parameters from world space agent dimensions.
    ///
    /// Height and radius round up so the agent always fits; climb rounds down
    /// so it never steps higher than allowed. Edge length and detail sampling
    /// scale with the cell size.
    #[allow(clippy::too_many_arguments)]
    pub fn from_agent(
        cell_size: f32,
        cell_height: f32,
        agent_height: f32,
        agent_radius: f32,
        agent_max_climb: f32,
        agent_max_slope: f32,
        bmin: Vec3,
        bmax: Vec3,
    ) -> Self {
        let mut config = Self {
            cs: cell_size,
            ch: cell_height,
            walkable_slope_angle: agent_max_slope,
            walkable_height: (agent_height / cell_height).ceil() as i32,
            walkable_climb: (agent_max_climb / cell_height).floor() as i32,
            walkable_radius: (agent_radius / cell_size).ceil() as i32,
            max_edge_len: (12.0 / cell_size) as i32,
            detail_sample_dist: 6.0 * cell_size,
            detail_sample_max_error: cell_height,
            ..Self::default()
        };
        config.calculate_grid_size(bmin, bmax);
        config
    }

    /// Sets the bounds and the grid size covering them.
    ///
    /// One extra cell is kept on the far side so geometry lying exactly on
    /// `bmax` is still rasterized.
    pub fn calculate_grid_size(&mut self, bmin: Vec3, bmax: Vec3) {
        self.bmin = bmin;
        self.bmax = bmax;
        self.width = ((bmax.x - bmin.x) / self.cs) as i32 + 1;
        self.height = ((bmax.z - bmin.z) / self.cs) as i32 + 1;
    }

    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::InvalidInput(format!(
                "grid size {}x{} is empty",
                self.width, self.height
            )));
        }

        if !(self.cs > 0.0 && self.cs.is_finite()) || !(self.ch > 0.0 && self.ch.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "cell size {} and cell height {} must be positive",
                self.cs, self.ch
            )));
        }

        if !(0.0..=90.0).contains(&self.walkable_slope_angle) {
            return Err(Error::InvalidInput(format!(
                "walkable slope {} is outside 0..=90 degrees",
                self.walkable_slope_angle
            )));
        }

        if self.walkable_height < 3 {
            return Err(Error::InvalidInput(format!(
                "walkable height of {} cells is below the minimum of 3",
                self.walkable_height
            )));
        }

        if self.walkable_climb < 0 || self.walkable_radius < 0 {
            return Err(Error::InvalidInput(
                "walkable climb and radius must not be negative".to_string(),
            ));
        }

        if !(3..=6).contains(&self.max_vertices_per_polygon) {
            return Err(Error::InvalidInput(format!(
                "{} vertices per polygon is outside 3..=6",
                self.max_vertices_per_polygon
            )));
        }

        if self.max_simplification_error < 0.0 || self.detail_sample_max_error < 0.0 {
            return Err(Error::InvalidInput(
                "error tolerances must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}
