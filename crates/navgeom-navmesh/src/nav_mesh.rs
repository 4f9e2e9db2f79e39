//! Navigation mesh with a bake / query lifecycle
//!
//! A [`NavMesh`] is either unbuilt, where every query yields an empty path,
//! or built, where it owns one baked navigation graph. Every build starts by
//! releasing the previous bake and leaves the mesh unbuilt when any stage
//! fails. The voxel intermediates never outlive the build call.

use std::time::Duration;

use glam::Vec3;
use navgeom_common::render::{Color, Renderer2D};
use navgeom_common::{calc_bounds, Error, Result, Vec2};
use navgeom_detour::{self as detour, NavMeshQuery, PolyFlags, QueryFilter, Status};
use navgeom_polygon::Polygon;
use navgeom_recast::{BuildContext, RecastBuilder, TimerCategory, RC_WALKABLE_AREA};

use crate::config::NavMeshConfig;

/// Half extents of the nearest polygon search for 2D queries
pub const QUERY_EXTENT_2D: Vec3 = Vec3::new(2.0, 0.0, 2.0);
/// Half extents of the nearest polygon search for 3D queries
pub const QUERY_EXTENT_3D: Vec3 = Vec3::new(2.0, 4.0, 2.0);
/// Search nodes available to one query
pub const MAX_SEARCH_NODES: usize = 2048;
/// Longest polygon corridor a query accepts
pub const MAX_PATH_POLYS: usize = 8192;
/// Most waypoints a query returns
pub const MAX_WAYPOINTS: usize = 8192;

/// Summary of the last successful bake
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub polygons: usize,
    pub vertices: usize,
    pub detail_triangles: usize,
    /// Accumulated time per pipeline stage
    pub timings: Vec<(TimerCategory, Duration)>,
}

impl BuildStats {
    pub fn timing(&self, category: TimerCategory) -> Option<Duration> {
        self.timings
            .iter()
            .find(|(c, _)| *c == category)
            .map(|&(_, d)| d)
    }
}

#[derive(Debug)]
struct Baked {
    mesh: detour::NavMesh,
    stats: BuildStats,
}

/// Walkable surface baked from triangles, answering path queries
///
/// Queries take `&self` and may run concurrently from several threads.
/// Building requires `&mut self`, so it can never overlap a query.
#[derive(Debug, Default)]
pub struct NavMesh {
    baked: Option<Baked>,
}

impl NavMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        self.baked.is_some()
    }

    /// Drops the baked graph; the mesh is unbuilt afterwards
    pub fn release(&mut self) {
        if self.baked.take().is_some() {
            log::debug!("released nav mesh");
        }
    }

    pub fn last_build_stats(&self) -> Option<&BuildStats> {
        self.baked.as_ref().map(|b| &b.stats)
    }

    /// The baked navigation graph, for queries beyond [`NavMesh::query`]
    pub fn detour_mesh(&self) -> Option<&detour::NavMesh> {
        self.baked.as_ref().map(|b| &b.mesh)
    }

    /// Bakes a 3D triangle soup.
    ///
    /// `area_ids` holds one id per triangle: 0 marks an obstacle, 1..=63 a
    /// walkable area. Any id above 63 rejects the input.
    pub fn build(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u32; 3]],
        area_ids: &[u8],
        config: &NavMeshConfig,
    ) -> Result<()> {
        self.release();

        let result = validate_input(vertices.len(), indices, area_ids)
            .and_then(|_| config.validate())
            .and_then(|_| bake(vertices, indices, area_ids, config));

        match result {
            Ok(baked) => {
                log::info!(
                    "nav mesh built: {} polygons, {} vertices",
                    baked.stats.polygons,
                    baked.stats.vertices
                );
                self.baked = Some(baked);
                Ok(())
            }
            Err(err) => {
                log::warn!("nav mesh build failed: {}", err);
                Err(err)
            }
        }
    }

    /// Bakes triangles lying on the XY plane; the plane maps to y = 0 with
    /// the 2D y axis along z.
    pub fn build_2d(
        &mut self,
        vertices: &[Vec2],
        indices: &[[u32; 3]],
        area_ids: &[u8],
        config: &NavMeshConfig,
    ) -> Result<()> {
        let vertices: Vec<Vec3> = vertices.iter().map(|&v| to_world(v)).collect();
        self.build(&vertices, indices, area_ids, config)
    }

    /// Bakes the triangulation of a polygon, every triangle tagged `area_id`
    pub fn build_polygon(&mut self, polygon: &Polygon, area_id: u8, config: &NavMeshConfig) -> Result<()> {
        let area_ids = vec![area_id; polygon.num_triangles()];
        self.build_2d(polygon.vertices(), polygon.indices(), &area_ids, config)
    }

    /// Path from `start` to `end` as waypoints, empty when there is none.
    ///
    /// `area_costs` overrides the traversal cost per area id; ids above 63
    /// are ignored.
    pub fn query(&self, start: Vec3, end: Vec3, area_costs: &[(u8, f32)]) -> Vec<Vec3> {
        self.find_waypoints(start, end, QUERY_EXTENT_3D, area_costs)
    }

    /// [`NavMesh::query`] on the plane used by [`NavMesh::build_2d`]
    pub fn query_2d(&self, start: Vec2, end: Vec2, area_costs: &[(u8, f32)]) -> Vec<Vec2> {
        self.find_waypoints(to_world(start), to_world(end), QUERY_EXTENT_2D, area_costs)
            .into_iter()
            .map(|v| Vec2::new(v.x as f64, v.z as f64))
            .collect()
    }

    fn find_waypoints(&self, start: Vec3, end: Vec3, extent: Vec3, area_costs: &[(u8, f32)]) -> Vec<Vec3> {
        let Some(baked) = &self.baked else {
            return Vec::new();
        };

        match find_waypoints(&baked.mesh, start, end, extent, area_costs) {
            Ok(waypoints) => waypoints,
            Err(status) => {
                log::debug!("no path from {} to {}: {}", start, end, status);
                Vec::new()
            }
        }
    }

    /// Hands the walkable surface, projected on the XZ plane, to `renderer`
    pub fn draw_2d<R: Renderer2D + ?Sized>(&self, renderer: &mut R, color: Color) {
        let Some(baked) = &self.baked else {
            return;
        };

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for reference in baked.mesh.poly_refs() {
            let Ok(tris) = baked.mesh.detail_triangles(reference) else {
                continue;
            };
            for tri in tris {
                let base = vertices.len() as u32;
                vertices.extend(tri.iter().map(|v| Vec2::new(v.x as f64, v.z as f64)));
                indices.push([base, base + 1, base + 2]);
            }
        }
        renderer.fill_triangles(&vertices, &indices, color);
    }
}

fn to_world(v: Vec2) -> Vec3 {
    Vec3::new(v.x as f32, 0.0, v.y as f32)
}

fn validate_input(vertex_count: usize, indices: &[[u32; 3]], area_ids: &[u8]) -> Result<()> {
    if vertex_count == 0 || indices.is_empty() || area_ids.is_empty() {
        return Err(Error::InvalidMesh("vertices, indices and area ids must not be empty".to_string()));
    }
    if indices.len() != area_ids.len() {
        return Err(Error::InvalidMesh(format!(
            "{} triangles but {} area ids",
            indices.len(),
            area_ids.len()
        )));
    }
    if let Some(area) = area_ids.iter().find(|&&a| a > RC_WALKABLE_AREA) {
        return Err(Error::InvalidMesh(format!(
            "area id {} exceeds {}",
            area, RC_WALKABLE_AREA
        )));
    }
    if let Some(tri) = indices.iter().find(|t| t.iter().any(|&i| i as usize >= vertex_count)) {
        return Err(Error::InvalidMesh(format!(
            "triangle {:?} references a vertex out of {}",
            tri, vertex_count
        )));
    }
    Ok(())
}

fn bake(vertices: &[Vec3], indices: &[[u32; 3]], area_ids: &[u8], config: &NavMeshConfig) -> Result<Baked> {
    let (bmin, bmax) =
        calc_bounds(vertices).ok_or_else(|| Error::InvalidMesh("no vertices".to_string()))?;
    let recast_config = config.to_recast(bmin, bmax);

    let mut ctx = BuildContext::new();
    let (mut poly_mesh, detail_mesh) =
        RecastBuilder::new(recast_config).build(&mut ctx, vertices, indices, area_ids)?;

    if poly_mesh.npolys == 0 {
        return Err(Error::NavMeshGeneration("no walkable surface".to_string()));
    }
    poly_mesh.flags.fill(PolyFlags::WALK.bits());

    let mesh = ctx.timed(TimerCategory::Bake, |_| {
        detour::NavMesh::from_recast(
            &poly_mesh,
            &detail_mesh,
            config.agent_height,
            config.agent_radius,
            config.agent_max_climb,
        )
    })?;

    let stats = BuildStats {
        polygons: mesh.poly_count(),
        vertices: poly_mesh.nverts(),
        detail_triangles: detail_mesh.ntris(),
        timings: ctx.timer_summary(),
    };
    Ok(Baked { mesh, stats })
}

fn find_waypoints(
    mesh: &detour::NavMesh,
    start: Vec3,
    end: Vec3,
    extent: Vec3,
    area_costs: &[(u8, f32)],
) -> detour::Result<Vec<Vec3>> {
    let mut filter = QueryFilter::default();
    for &(area, cost) in area_costs {
        if area <= RC_WALKABLE_AREA {
            filter.set_area_cost(area, cost);
        }
    }

    let mut query = NavMeshQuery::new(mesh, MAX_SEARCH_NODES);
    let (start_ref, _) = query.find_nearest_poly(start, extent, &filter)?;
    let (end_ref, _) = query.find_nearest_poly(end, extent, &filter)?;

    let corridor = query.find_path(start_ref, end_ref, start, end, &filter, MAX_PATH_POLYS)?;
    let last = *corridor.last().ok_or(Status::PathInvalid)?;

    // the goal is unreachable, aim for the closest point of the last polygon
    let end = if last != end_ref {
        query.closest_point_on_poly(last, end)?.0
    } else {
        end
    };

    Ok(query
        .find_straight_path(start, end, &corridor, MAX_WAYPOINTS)?
        .waypoints)
}
