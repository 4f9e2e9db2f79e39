//! Bake parameters in world units

use glam::Vec3;
use navgeom_common::{Error, Result};
use navgeom_recast::RecastConfig;

/// Agent and voxel parameters for a bake
///
/// Every field must be supplied by the caller; there is no default.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NavMeshConfig {
    /// Voxel size on the XZ plane
    pub cell_size: f32,
    /// Voxel size along y
    pub cell_height: f32,
    /// Clearance the agent needs above the floor
    pub agent_height: f32,
    /// Distance kept from walls and ledges
    pub agent_radius: f32,
    /// Highest step the agent can climb
    pub agent_max_climb: f32,
    /// Steepest walkable slope in degrees
    pub agent_max_slope: f32,
}

impl NavMeshConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v > 0.0 && v.is_finite();
        let non_negative = |v: f32| v >= 0.0 && v.is_finite();

        if !positive(self.cell_size) || !positive(self.cell_height) {
            return Err(Error::InvalidInput(format!(
                "cell size {} and cell height {} must be positive",
                self.cell_size, self.cell_height
            )));
        }
        if !positive(self.agent_height) {
            return Err(Error::InvalidInput(format!(
                "agent height {} must be positive",
                self.agent_height
            )));
        }
        if !non_negative(self.agent_radius) || !non_negative(self.agent_max_climb) {
            return Err(Error::InvalidInput(format!(
                "agent radius {} and max climb {} must not be negative",
                self.agent_radius, self.agent_max_climb
            )));
        }
        if !(0.0..=90.0).contains(&self.agent_max_slope) {
            return Err(Error::InvalidInput(format!(
                "agent max slope {} is outside 0..=90 degrees",
                self.agent_max_slope
            )));
        }
        Ok(())
    }

    /// Voxel configuration covering `bmin..bmax`
    pub fn to_recast(&self, bmin: Vec3, bmax: Vec3) -> RecastConfig {
        RecastConfig::from_agent(
            self.cell_size,
            self.cell_height,
            self.agent_height,
            self.agent_radius,
            self.agent_max_climb,
            self.agent_max_slope,
            bmin,
            bmax,
        )
    }
}
