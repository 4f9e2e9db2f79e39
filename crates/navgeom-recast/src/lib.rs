//! Recast component for navigation mesh generation
//!
//! Turns a triangle soup into a polygon mesh that covers every surface an
//! agent of a given height, radius and climb can stand on. The pipeline
//! voxelizes the input, filters out unreachable spans, partitions what is
//! left into regions, traces their outlines and finally converts the
//! outlines into convex polygons with a height detail mesh on top.

use std::alloc::Layout;

use glam::Vec3;

use navgeom_common::Result;

mod area;
mod compact_heightfield;
mod config;
mod context;
mod contour;
mod detail_mesh;
mod distance_field;
mod heightfield;
mod pipeline_tests;
mod polymesh;
mod predicates;
mod rasterization;
mod regions;

pub use area::{clear_unwalkable_triangles, erode_walkable_area};
pub use compact_heightfield::{
    CompactCell, CompactHeightfield, CompactSpan, RC_BORDER_REG, RC_NOT_CONNECTED,
};
pub use config::RecastConfig;
pub use context::{BuildContext, LogEntry, LogLevel, TimerCategory};
pub use contour::{BuildContoursFlags, Contour, ContourSet};
pub use detail_mesh::PolyMeshDetail;
pub use distance_field::build_distance_field;
pub use heightfield::{Heightfield, Span, SPAN_MAX_HEIGHT};
pub use polymesh::{PolyMesh, MESH_NULL_IDX};
pub use rasterization::{rasterize_triangle, rasterize_triangles};
pub use regions::{build_regions, build_regions_monotone, RegionPartition};

/// Area id of spans that are not walkable
pub const RC_NULL_AREA: u8 = 0;
/// Default area id of walkable spans, also the largest valid area id
pub const RC_WALKABLE_AREA: u8 = 63;

const DIR_OFFSET_X: [i32; 4] = [-1, 0, 1, 0];
const DIR_OFFSET_Y: [i32; 4] = [0, 1, 0, -1];

/// X offset of the neighbor cell in direction `dir` (0..4)
#[inline]
pub fn get_dir_offset_x(dir: usize) -> i32 {
    DIR_OFFSET_X[dir & 0x03]
}

/// Z offset of the neighbor cell in direction `dir` (0..4)
#[inline]
pub fn get_dir_offset_y(dir: usize) -> i32 {
    DIR_OFFSET_Y[dir & 0x03]
}

/// Grows `buf` by `additional` elements or aborts through the global
/// allocation error handler.
pub(crate) fn reserve_or_abort<T>(buf: &mut Vec<T>, additional: usize) {
    if buf.try_reserve_exact(additional).is_err() {
        let layout = Layout::array::<T>(buf.len().saturating_add(additional))
            .unwrap_or_else(|_| Layout::new::<T>());
        std::alloc::handle_alloc_error(layout);
    }
}

/// Builder for Recast navigation mesh generation
#[derive(Debug, Clone)]
pub struct RecastBuilder {
    config: RecastConfig,
}

impl RecastBuilder {
    pub fn new(config: RecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecastConfig {
        &self.config
    }

    /// Runs the whole pipeline over an indexed triangle list.
    ///
    /// `areas` holds one area id per triangle; triangles steeper than the
    /// configured slope are cleared before rasterization. The caller's
    /// slice is not modified.
    pub fn build(
        &self,
        ctx: &mut BuildContext,
        vertices: &[Vec3],
        triangles: &[[u32; 3]],
        areas: &[u8],
    ) -> Result<(PolyMesh, PolyMeshDetail)> {
        self.config.validate()?;

        ctx.timed(TimerCategory::Total, |ctx| -> Result<(PolyMesh, PolyMeshDetail)> {
            let cfg = &self.config;

            let mut heightfield =
                Heightfield::new(cfg.width, cfg.height, cfg.bmin, cfg.bmax, cfg.cs, cfg.ch)?;

            let mut tri_areas = areas.to_vec();
            let cleared = ctx.timed(TimerCategory::Filtering, |_| {
                clear_unwalkable_triangles(cfg.walkable_slope_angle, vertices, triangles, &mut tri_areas)
            });
            if cleared > 0 {
                ctx.log_debug(format!("{} triangles too steep to walk on", cleared));
            }

            rasterize_triangles(ctx, vertices, triangles, &tri_areas, &mut heightfield, 0)?;

            ctx.timed(TimerCategory::Filtering, |_| {
                heightfield.filter_low_hanging_walkable_obstacles(cfg.walkable_climb);
                heightfield.filter_ledge_spans(cfg.walkable_height, cfg.walkable_climb);
                heightfield.filter_walkable_low_height_spans(cfg.walkable_height);
            });

            let mut chf =
                CompactHeightfield::build(ctx, cfg.walkable_height, cfg.walkable_climb, &heightfield)?;
            drop(heightfield);

            erode_walkable_area(ctx, cfg.walkable_radius, &mut chf)?;

            match cfg.region_partition {
                RegionPartition::Watershed => {
                    build_distance_field(ctx, &mut chf)?;
                    build_regions(
                        ctx,
                        &mut chf,
                        cfg.border_size,
                        cfg.min_region_area,
                        cfg.merge_region_area,
                    )?;
                }
                RegionPartition::Monotone => {
                    build_regions_monotone(
                        ctx,
                        &mut chf,
                        cfg.border_size,
                        cfg.min_region_area,
                        cfg.merge_region_area,
                    )?;
                }
            }

            let cset = ContourSet::build(
                ctx,
                &chf,
                cfg.max_simplification_error,
                cfg.max_edge_len,
                BuildContoursFlags::default(),
            )?;

            let pmesh = PolyMesh::build(ctx, &cset, cfg.max_vertices_per_polygon as usize)?;

            let dmesh = PolyMeshDetail::build(
                ctx,
                &pmesh,
                &chf,
                cfg.detail_sample_dist,
                cfg.detail_sample_max_error,
            )?;

            ctx.log_info(format!(
                "built {} polygons over {} vertices ({} detail triangles)",
                pmesh.npolys,
                pmesh.nverts(),
                dmesh.ntris()
            ));

            Ok((pmesh, dmesh))
        })
    }
}
