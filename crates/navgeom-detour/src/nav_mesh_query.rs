//! Navigation mesh query implementation for Detour
//!
//! This module contains the NavMeshQuery structure, which resolves points to
//! polygons, searches polygon corridors with A* and straightens corridors
//! into waypoints with the funnel algorithm.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec3;
use navgeom_common::{
    closest_height_point_triangle, closest_point_on_segment_2d, dist_point_segment_sqr_2d,
    distance_pt_poly_edges_sqr, point_in_polygon_2d, tri_area_2d, v_equal,
};

use super::node_pool::{NodeFlags, NodeIndex, NodePool, DT_NULL_IDX};
use super::{NavMesh, Path, PolyRef, QueryFilter, Result, Status, StraightPathFlags};

/// Scale of the A* heuristic, slightly below one to keep it admissible
const H_SCALE: f32 = 0.999;

/// Node wrapper for the binary heap (priority queue)
#[derive(Debug, Clone, Copy)]
struct HeapNode {
    /// Reference to the node in the node pool
    index: NodeIndex,
    /// Total cost (f value)
    f: f32,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed for a min-heap, NaN sorts last
        other.f.total_cmp(&self.f)
    }
}

/// Navigation mesh query structure
///
/// Owns its search state, so a query object is cheap to create per thread
/// while the mesh itself is shared.
#[derive(Debug)]
pub struct NavMeshQuery<'a> {
    nav_mesh: &'a NavMesh,
    node_pool: NodePool,
    open_list: BinaryHeap<HeapNode>,
}

impl<'a> NavMeshQuery<'a> {
    /// Creates a query with a search pool of `max_nodes` nodes
    pub fn new(nav_mesh: &'a NavMesh, max_nodes: usize) -> Self {
        Self {
            nav_mesh,
            node_pool: NodePool::new(max_nodes),
            open_list: BinaryHeap::new(),
        }
    }

    pub fn nav_mesh(&self) -> &NavMesh {
        self.nav_mesh
    }

    /// Finds the polygon nearest to `center` among those overlapping the
    /// box `center ± half_extents`.
    ///
    /// A point above or below a polygon is considered at distance zero while
    /// within the walkable climb of its surface.
    pub fn find_nearest_poly(
        &self,
        center: Vec3,
        half_extents: Vec3,
        filter: &QueryFilter,
    ) -> Result<(PolyRef, Vec3)> {
        let polys = self
            .nav_mesh
            .query_polygons(center - half_extents, center + half_extents, filter);

        let climb = self.nav_mesh.walkable_climb();
        let mut nearest = None;
        let mut nearest_dist = f32::MAX;

        for reference in polys {
            let (closest, over_poly) = self.closest_point_on_poly(reference, center)?;
            let diff = center - closest;
            let d = if over_poly {
                let dy = (diff.y.abs() - climb).max(0.0);
                dy * dy
            } else {
                diff.length_squared()
            };

            if d < nearest_dist {
                nearest_dist = d;
                nearest = Some((reference, closest));
            }
        }

        Status::NotFound.or_none(nearest)
    }

    /// Closest point on the surface of a polygon, and whether `pos` lies
    /// over the polygon on the XZ plane.
    pub fn closest_point_on_poly(&self, reference: PolyRef, pos: Vec3) -> Result<(Vec3, bool)> {
        let poly = self.nav_mesh.get_poly(reference)?;
        let verts = self.nav_mesh.poly_vertices(poly);

        if point_in_polygon_2d(pos, &verts) {
            let height = self
                .nav_mesh
                .detail_triangles(reference)?
                .iter()
                .find_map(|&[a, b, c]| closest_height_point_triangle(pos, a, b, c));
            if let Some(h) = height {
                return Ok((Vec3::new(pos.x, h, pos.z), true));
            }
        }

        let mut closest = pos;
        let mut best = f32::MAX;
        for (a, b) in self.nav_mesh.detail_boundary_edges(reference)? {
            let (d, _) = dist_point_segment_sqr_2d(pos, a, b);
            if d < best {
                best = d;
                closest = closest_point_on_segment_2d(pos, a, b);
            }
        }

        let over_poly = point_in_polygon_2d(pos, &verts);
        if over_poly {
            closest.x = pos.x;
            closest.z = pos.z;
        }
        Ok((closest, over_poly))
    }

    /// `pos` when it lies inside the polygon, otherwise the closest point on
    /// the polygon outline. The height is not adjusted for inside points.
    pub fn closest_point_on_poly_boundary(&self, reference: PolyRef, pos: Vec3) -> Result<Vec3> {
        let poly = self.nav_mesh.get_poly(reference)?;
        let verts = self.nav_mesh.poly_vertices(poly);

        let (inside, edge_dists, edge_ts) = distance_pt_poly_edges_sqr(pos, &verts);
        if inside {
            return Ok(pos);
        }

        let (imin, _) = edge_dists
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .ok_or(Status::NavMeshInvalid)?;
        let va = verts[imin];
        let vb = verts[(imin + 1) % verts.len()];
        Ok(va.lerp(vb, edge_ts[imin]))
    }

    /// Left and right end of the edge shared by two adjacent polygons, as
    /// seen when walking from `from` into `to`.
    pub fn get_portal_points(&self, from: PolyRef, to: PolyRef) -> Result<(Vec3, Vec3)> {
        let from_poly = self.nav_mesh.get_poly(from)?;
        self.nav_mesh.get_poly(to)?;

        let link = self
            .nav_mesh
            .find_link(from_poly, to)
            .ok_or(Status::PathInvalid)?;

        let verts = self.nav_mesh.poly_vertices(from_poly);
        let edge = link.edge as usize;
        let v0 = verts[edge];
        let v1 = verts[(edge + 1) % verts.len()];

        let center = verts.iter().copied().sum::<Vec3>() / verts.len() as f32;
        if tri_area_2d(center, v0, v1) > 0.0 {
            Ok((v0, v1))
        } else {
            Ok((v1, v0))
        }
    }

    fn edge_mid_point(&self, from: PolyRef, to: PolyRef) -> Result<Vec3> {
        let (left, right) = self.get_portal_points(from, to)?;
        Ok((left + right) * 0.5)
    }

    /// A* search for a polygon corridor from `start_ref` to `end_ref`.
    ///
    /// Search nodes sit at edge midpoints. When the end polygon cannot be
    /// reached the corridor to the polygon closest to `end_pos` is returned,
    /// so callers compare the last polygon with `end_ref`. A corridor longer
    /// than `max_path` fails with [`Status::BufferTooSmall`].
    pub fn find_path(
        &mut self,
        start_ref: PolyRef,
        end_ref: PolyRef,
        start_pos: Vec3,
        end_pos: Vec3,
        filter: &QueryFilter,
        max_path: usize,
    ) -> Result<Vec<PolyRef>> {
        let nav_mesh = self.nav_mesh;
        nav_mesh.get_poly(start_ref)?;
        nav_mesh.get_poly(end_ref)?;
        if max_path == 0 || !start_pos.is_finite() || !end_pos.is_finite() {
            return Err(Status::InvalidParam);
        }

        if start_ref == end_ref {
            return Ok(vec![start_ref]);
        }

        self.node_pool.clear();
        self.open_list.clear();

        let start_idx = self.node_pool.get_node(start_ref).ok_or(Status::OutOfNodes)?;
        let start_total = start_pos.distance(end_pos) * H_SCALE;
        {
            let node = self.node_pool.node_mut(start_idx);
            node.pos = start_pos;
            node.pidx = DT_NULL_IDX;
            node.cost = 0.0;
            node.total = start_total;
            node.flags.insert(NodeFlags::OPEN);
        }
        self.open_list.push(HeapNode {
            index: start_idx,
            f: start_total,
        });

        let mut last_best = start_idx;
        let mut last_best_cost = start_total;
        let mut out_of_nodes = false;

        while let Some(HeapNode { index: best_idx, .. }) = self.open_list.pop() {
            let best = self.node_pool.node(best_idx).clone();
            if best.flags.contains(NodeFlags::CLOSED) {
                continue;
            }
            {
                let node = self.node_pool.node_mut(best_idx);
                node.flags.remove(NodeFlags::OPEN);
                node.flags.insert(NodeFlags::CLOSED);
            }

            if best.id == end_ref {
                last_best = best_idx;
                break;
            }

            let best_poly = nav_mesh.get_poly(best.id)?;
            let parent_ref = if best.pidx != DT_NULL_IDX {
                self.node_pool.node(best.pidx).id
            } else {
                PolyRef::NULL
            };

            for link in nav_mesh.links(best_poly) {
                let neighbour_ref = link.reference;
                if !neighbour_ref.is_valid() || neighbour_ref == parent_ref {
                    continue;
                }

                let neighbour_poly = nav_mesh.get_poly(neighbour_ref)?;
                if !filter.pass_filter(neighbour_poly) {
                    continue;
                }

                let Some(neighbour_idx) = self.node_pool.get_node(neighbour_ref) else {
                    out_of_nodes = true;
                    continue;
                };

                if self.node_pool.node(neighbour_idx).flags == NodeFlags::default() {
                    let mid = self.edge_mid_point(best.id, neighbour_ref)?;
                    self.node_pool.node_mut(neighbour_idx).pos = mid;
                }

                let neighbour = self.node_pool.node(neighbour_idx);
                let cur_cost = filter.get_cost(best.pos, neighbour.pos, best_poly.area);
                let (cost, heuristic) = if neighbour_ref == end_ref {
                    let end_cost = filter.get_cost(neighbour.pos, end_pos, neighbour_poly.area);
                    (best.cost + cur_cost + end_cost, 0.0)
                } else {
                    (best.cost + cur_cost, neighbour.pos.distance(end_pos) * H_SCALE)
                };
                let total = cost + heuristic;

                let visited = neighbour.flags.contains(NodeFlags::OPEN)
                    || neighbour.flags.contains(NodeFlags::CLOSED);
                if visited && total >= neighbour.total {
                    continue;
                }

                let node = self.node_pool.node_mut(neighbour_idx);
                node.pidx = best_idx;
                node.cost = cost;
                node.total = total;
                node.flags.remove(NodeFlags::CLOSED);
                node.flags.insert(NodeFlags::OPEN);
                self.open_list.push(HeapNode {
                    index: neighbour_idx,
                    f: total,
                });

                if heuristic < last_best_cost {
                    last_best_cost = heuristic;
                    last_best = neighbour_idx;
                }
            }
        }

        if out_of_nodes {
            log::debug!("find_path ran out of search nodes");
        }

        let path = self.node_pool.path_to(last_best);
        if path.last() != Some(&end_ref) {
            log::debug!(
                "find_path: {} not reachable from {}, returning partial corridor",
                end_ref,
                start_ref
            );
        }
        if path.len() > max_path {
            return Err(Status::BufferTooSmall);
        }
        Ok(path)
    }

    /// Straightens a polygon corridor into waypoints with the funnel
    /// algorithm.
    ///
    /// The first waypoint is `start_pos` clamped to the first polygon and the
    /// last is `end_pos` clamped to the last polygon. The result is cut off
    /// after `max_straight_path` waypoints.
    pub fn find_straight_path(
        &self,
        start_pos: Vec3,
        end_pos: Vec3,
        path: &[PolyRef],
        max_straight_path: usize,
    ) -> Result<Path> {
        let (&first, &last) = path.first().zip(path.last()).ok_or(Status::InvalidParam)?;
        if max_straight_path == 0 {
            return Err(Status::InvalidParam);
        }

        let closest_start = self.closest_point_on_poly_boundary(first, start_pos)?;
        let closest_end = self.closest_point_on_poly_boundary(last, end_pos)?;

        let mut out = Path::default();
        if !append_vertex(&mut out, closest_start, StraightPathFlags::START, first, max_straight_path) {
            return Ok(out);
        }

        if path.len() > 1 {
            let mut portal_apex = closest_start;
            let mut portal_left = portal_apex;
            let mut portal_right = portal_apex;
            let mut left_index = 0;
            let mut right_index = 0;
            let mut left_poly_ref = first;
            let mut right_poly_ref = first;

            let mut i = 0;
            while i < path.len() {
                let (left, right) = if i + 1 < path.len() {
                    match self.get_portal_points(path[i], path[i + 1]) {
                        Ok(portal) => portal,
                        Err(_) => {
                            // broken corridor, stop at the last valid polygon
                            let end = self.closest_point_on_poly_boundary(path[i], end_pos)?;
                            append_vertex(&mut out, end, StraightPathFlags::empty(), path[i], max_straight_path);
                            return Ok(out);
                        }
                    }
                } else {
                    (closest_end, closest_end)
                };

                // starting right at the first portal
                if i == 0 && i + 1 < path.len() {
                    let (d, _) = dist_point_segment_sqr_2d(portal_apex, left, right);
                    if d < 0.001 * 0.001 {
                        i += 1;
                        continue;
                    }
                }

                let next_ref = path.get(i + 1).copied().unwrap_or(PolyRef::NULL);

                if tri_area_2d(portal_apex, portal_right, right) <= 0.0 {
                    if v_equal(portal_apex, portal_right) || tri_area_2d(portal_apex, portal_left, right) > 0.0 {
                        portal_right = right;
                        right_poly_ref = next_ref;
                        right_index = i;
                    } else {
                        portal_apex = portal_left;
                        let apex_index = left_index;

                        let flags = if left_poly_ref.is_valid() {
                            StraightPathFlags::empty()
                        } else {
                            StraightPathFlags::END
                        };
                        if !append_vertex(&mut out, portal_apex, flags, left_poly_ref, max_straight_path) {
                            return Ok(out);
                        }

                        portal_left = portal_apex;
                        portal_right = portal_apex;
                        left_index = apex_index;
                        right_index = apex_index;

                        i = apex_index + 1;
                        continue;
                    }
                }

                if tri_area_2d(portal_apex, portal_left, left) >= 0.0 {
                    if v_equal(portal_apex, portal_left) || tri_area_2d(portal_apex, portal_right, left) < 0.0 {
                        portal_left = left;
                        left_poly_ref = next_ref;
                        left_index = i;
                    } else {
                        portal_apex = portal_right;
                        let apex_index = right_index;

                        let flags = if right_poly_ref.is_valid() {
                            StraightPathFlags::empty()
                        } else {
                            StraightPathFlags::END
                        };
                        if !append_vertex(&mut out, portal_apex, flags, right_poly_ref, max_straight_path) {
                            return Ok(out);
                        }

                        portal_left = portal_apex;
                        portal_right = portal_apex;
                        left_index = apex_index;
                        right_index = apex_index;

                        i = apex_index + 1;
                        continue;
                    }
                }

                i += 1;
            }
        }

        append_vertex(&mut out, closest_end, StraightPathFlags::END, PolyRef::NULL, max_straight_path);
        Ok(out)
    }
}

/// Appends a waypoint, merging it into the previous one when they coincide.
///
/// Returns false once the path is complete or full.
fn append_vertex(
    path: &mut Path,
    pos: Vec3,
    flags: StraightPathFlags,
    reference: PolyRef,
    max: usize,
) -> bool {
    if path.waypoints.last().is_some_and(|&last| v_equal(last, pos)) {
        if let (Some(f), Some(r)) = (path.flags.last_mut(), path.poly_refs.last_mut()) {
            *f |= flags;
            *r = reference;
        }
    } else {
        path.waypoints.push(pos);
        path.flags.push(flags);
        path.poly_refs.push(reference);
        if path.len() >= max {
            return false;
        }
    }
    !flags.contains(StraightPathFlags::END)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mesh_helpers::{grid_nav_mesh, grid_nav_mesh_with_holes, CELL_HEIGHT};
    use crate::{PolyFlags, DT_DEFAULT_MAX_NODES};
    use approx::assert_relative_eq;

    const EXTENT: Vec3 = Vec3::new(2.0, 4.0, 2.0);

    fn resolve(query: &NavMeshQuery, p: Vec3) -> Result<(PolyRef, Vec3)> {
        query.find_nearest_poly(p, EXTENT, &QueryFilter::default())
    }

    #[test]
    fn test_find_nearest_poly() -> Result<()> {
        let nav_mesh = grid_nav_mesh(3, 3)?;
        let query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);

        let (r, p) = resolve(&query, Vec3::new(1.5, 0.0, 2.5))?;
        assert_eq!(r, nav_mesh.poly_ref(7));
        assert_relative_eq!(p.x, 1.5);
        assert_relative_eq!(p.y, CELL_HEIGHT, epsilon = 1e-5);
        assert_relative_eq!(p.z, 2.5);

        // outside the mesh but within the extent snaps onto the border
        let (r, p) = resolve(&query, Vec3::new(-0.5, 0.0, 0.5))?;
        assert_eq!(r, nav_mesh.poly_ref(0));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);

        assert_eq!(
            resolve(&query, Vec3::new(40.0, 0.0, 40.0)).err(),
            Some(Status::NotFound)
        );
        Ok(())
    }

    #[test]
    fn test_nearest_poly_2d_extent() -> Result<()> {
        let nav_mesh = grid_nav_mesh(2, 2)?;
        let query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);

        // points on the ground plane reach polygons lifted by the cell height
        let (r, _) = query.find_nearest_poly(
            Vec3::new(1.5, 0.0, 0.5),
            Vec3::new(2.0, 0.0, 2.0),
            &QueryFilter::default(),
        )?;
        assert_eq!(r, nav_mesh.poly_ref(1));
        Ok(())
    }

    #[test]
    fn test_find_path_straight_line() -> Result<()> {
        let nav_mesh = grid_nav_mesh(4, 1)?;
        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let filter = QueryFilter::default();

        let start = Vec3::new(0.5, 0.0, 0.5);
        let end = Vec3::new(3.5, 0.0, 0.5);
        let path = query.find_path(nav_mesh.poly_ref(0), nav_mesh.poly_ref(3), start, end, &filter, 64)?;
        assert_eq!(path, nav_mesh.poly_refs().collect::<Vec<_>>());

        let straight = query.find_straight_path(start, end, &path, 64)?;
        assert_eq!(straight.len(), 2);
        assert_eq!(straight.flags[0], StraightPathFlags::START);
        assert_eq!(straight.flags[1], StraightPathFlags::END);
        assert_relative_eq!(straight.length(), 3.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn test_same_poly_path() -> Result<()> {
        let nav_mesh = grid_nav_mesh(2, 2)?;
        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let r = nav_mesh.poly_ref(3);
        let p = Vec3::new(1.5, 0.0, 1.5);
        assert_eq!(query.find_path(r, r, p, p, &QueryFilter::default(), 8)?, vec![r]);
        Ok(())
    }

    #[test]
    fn test_path_around_wall() -> Result<()> {
        // 3x3 with the middle column blocked except at the top row
        let nav_mesh = grid_nav_mesh_with_holes(3, 3, &[(1, 0), (1, 1)])?;
        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let filter = QueryFilter::default();

        let start = Vec3::new(0.5, 0.0, 0.5);
        let end = Vec3::new(2.5, 0.0, 0.5);
        let (start_ref, _) = resolve(&query, start)?;
        let (end_ref, _) = resolve(&query, end)?;

        let path = query.find_path(start_ref, end_ref, start, end, &filter, 64)?;
        assert_eq!(path.first(), Some(&start_ref));
        assert_eq!(path.last(), Some(&end_ref));
        assert_eq!(path.len(), 7);

        let straight = query.find_straight_path(start, end, &path, 64)?;
        // bends around both corners of the wall
        assert_eq!(straight.len(), 4);
        for p in &straight.waypoints {
            assert!(p.x >= -1e-4 && p.x <= 3.0 + 1e-4);
            assert!(p.z >= -1e-4 && p.z <= 3.0 + 1e-4);
        }
        assert_relative_eq!(straight.waypoints[1].x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(straight.waypoints[1].z, 2.0, epsilon = 1e-4);
        assert_relative_eq!(straight.waypoints[2].x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(straight.waypoints[2].z, 2.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn test_partial_path_to_disconnected_island() -> Result<()> {
        // the middle column splits the grid in two
        let nav_mesh = grid_nav_mesh_with_holes(3, 2, &[(1, 0), (1, 1)])?;
        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let filter = QueryFilter::default();

        let start = Vec3::new(0.5, 0.0, 0.5);
        let end = Vec3::new(2.5, 0.0, 1.5);
        let (start_ref, _) = resolve(&query, start)?;
        let (end_ref, _) = resolve(&query, end)?;

        let path = query.find_path(start_ref, end_ref, start, end, &filter, 64)?;
        assert_ne!(path.last(), Some(&end_ref));
        // the partial corridor ends on the side closest to the goal
        let last = nav_mesh.get_poly_center(*path.last().unwrap_or(&PolyRef::NULL))?;
        assert_relative_eq!(last.z, 1.5, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn test_corridor_too_long() -> Result<()> {
        let nav_mesh = grid_nav_mesh(8, 1)?;
        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let result = query.find_path(
            nav_mesh.poly_ref(0),
            nav_mesh.poly_ref(7),
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(7.5, 0.0, 0.5),
            &QueryFilter::default(),
            4,
        );
        assert_eq!(result.err(), Some(Status::BufferTooSmall));
        Ok(())
    }

    #[test]
    fn test_area_costs_steer_search() -> Result<()> {
        // two routes around a hole; the short one crosses an expensive area
        let mut nav_mesh = grid_nav_mesh_with_holes(3, 3, &[(1, 1)])?;
        let bottom_middle = nav_mesh.poly_ref(1);
        nav_mesh.set_poly_area(bottom_middle, 5)?;

        let mut filter = QueryFilter::default();
        filter.set_area_cost(5, 100.0);

        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let start = Vec3::new(0.5, 0.0, 0.5);
        let end = Vec3::new(2.5, 0.0, 0.5);
        let path = query.find_path(nav_mesh.poly_ref(0), nav_mesh.poly_ref(2), start, end, &filter, 64)?;
        assert!(!path.contains(&bottom_middle));

        let cheap = query.find_path(
            nav_mesh.poly_ref(0),
            nav_mesh.poly_ref(2),
            start,
            end,
            &QueryFilter::default(),
            64,
        )?;
        assert_eq!(cheap, vec![nav_mesh.poly_ref(0), bottom_middle, nav_mesh.poly_ref(2)]);
        Ok(())
    }

    #[test]
    fn test_excluded_polys_are_skipped() -> Result<()> {
        let mut nav_mesh = grid_nav_mesh(3, 1)?;
        nav_mesh.set_poly_flags(nav_mesh.poly_ref(1), PolyFlags::DISABLED)?;

        let filter = QueryFilter {
            exclude_flags: PolyFlags::DISABLED,
            ..Default::default()
        };
        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let path = query.find_path(
            nav_mesh.poly_ref(0),
            nav_mesh.poly_ref(2),
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(2.5, 0.0, 0.5),
            &filter,
            64,
        )?;
        assert_eq!(path, vec![nav_mesh.poly_ref(0)]);
        Ok(())
    }

    #[test]
    fn test_straight_path_truncated() -> Result<()> {
        let nav_mesh = grid_nav_mesh_with_holes(3, 3, &[(1, 0), (1, 1)])?;
        let mut query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let start = Vec3::new(0.5, 0.0, 0.5);
        let end = Vec3::new(2.5, 0.0, 0.5);
        let (s, _) = resolve(&query, start)?;
        let (e, _) = resolve(&query, end)?;
        let path = query.find_path(s, e, start, end, &QueryFilter::default(), 64)?;

        let straight = query.find_straight_path(start, end, &path, 2)?;
        assert_eq!(straight.len(), 2);
        assert!(!straight.flags[1].contains(StraightPathFlags::END));
        Ok(())
    }

    #[test]
    fn test_portal_points_are_oriented() -> Result<()> {
        let nav_mesh = grid_nav_mesh(2, 1)?;
        let query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let (a, b) = (nav_mesh.poly_ref(0), nav_mesh.poly_ref(1));

        let (left, right) = query.get_portal_points(a, b)?;
        let (back_left, back_right) = query.get_portal_points(b, a)?;
        assert!(v_equal(left, back_right));
        assert!(v_equal(right, back_left));
        assert_relative_eq!(left.x, 1.0);
        assert_relative_eq!(right.x, 1.0);

        assert_eq!(
            query.get_portal_points(a, nav_mesh.poly_ref(0)).err(),
            Some(Status::PathInvalid)
        );
        Ok(())
    }

    #[test]
    fn test_closest_point_on_boundary() -> Result<()> {
        let nav_mesh = grid_nav_mesh(1, 1)?;
        let query = NavMeshQuery::new(&nav_mesh, DT_DEFAULT_MAX_NODES);
        let r = nav_mesh.poly_ref(0);

        let inside = Vec3::new(0.25, 3.0, 0.75);
        assert_eq!(query.closest_point_on_poly_boundary(r, inside)?, inside);

        let clamped = query.closest_point_on_poly_boundary(r, Vec3::new(2.0, 0.0, 0.5))?;
        assert_relative_eq!(clamped.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(clamped.z, 0.5, epsilon = 1e-5);
        Ok(())
    }
}
