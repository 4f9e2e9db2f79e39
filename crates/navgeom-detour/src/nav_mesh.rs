//! Baked navigation mesh
//!
//! Holds the polygons of one bake in world space together with their
//! adjacency links, the height detail triangles and a bounding volume tree
//! for spatial lookups. Every bake draws a fresh salt, so [`PolyRef`]s handed
//! out by an earlier bake are rejected instead of resolving to an unrelated
//! polygon.

use std::sync::atomic::{AtomicU16, Ordering};

use glam::Vec3;
use navgeom_common::{calc_bounds, closest_height_point_triangle, point_in_polygon_2d};
use navgeom_recast::{PolyMesh, PolyMeshDetail, MESH_NULL_IDX};

use super::bv_tree::BVTree;
use super::{PolyFlags, PolyRef, QueryFilter, Result, Status, MAX_VERTS_PER_POLY};

/// Neighbor slots with this bit set face a tile border, not a polygon
const PORTAL_FLAG: u16 = 0x8000;

static NEXT_SALT: AtomicU16 = AtomicU16::new(1);

fn next_salt() -> u16 {
    loop {
        let salt = NEXT_SALT.fetch_add(1, Ordering::Relaxed);
        if salt != 0 {
            return salt;
        }
    }
}

/// Link between two polygons
#[derive(Debug, Clone, Copy)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Link {
    /// Reference to the connected polygon
    pub reference: PolyRef,
    /// Edge of the owning polygon the link crosses
    pub edge: u8,
    /// Index of the next link in the linked list (None if last)
    pub next: Option<u32>,
}

/// Polygon in the navigation mesh
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Poly {
    /// First link index
    pub first_link: Option<u32>,
    /// Vertices of the polygon (indices into the navigation mesh vertex array)
    pub verts: [u16; MAX_VERTS_PER_POLY],
    /// Neighbor polygon index plus one across each edge, 0 for a wall
    pub neighbors: [u16; MAX_VERTS_PER_POLY],
    pub flags: PolyFlags,
    pub vert_count: u8,
    pub area: u8,
}

impl Poly {
    /// Vertex indices actually in use
    pub fn vertex_indices(&self) -> &[u16] {
        &self.verts[..self.vert_count as usize]
    }
}

/// Detail sub-mesh of one polygon
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PolyDetail {
    pub vert_base: u32,
    pub vert_count: u32,
    pub tri_base: u32,
    pub tri_count: u32,
}

/// A baked, read only navigation mesh
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NavMesh {
    salt: u16,
    verts: Vec<Vec3>,
    polys: Vec<Poly>,
    links: Vec<Link>,
    detail_meshes: Vec<PolyDetail>,
    detail_verts: Vec<Vec3>,
    detail_tris: Vec<[u8; 4]>,
    bv_tree: BVTree,
    bmin: Vec3,
    bmax: Vec3,
    walkable_height: f32,
    walkable_radius: f32,
    walkable_climb: f32,
}

impl NavMesh {
    /// Bakes a polygon mesh and its detail mesh into a queryable mesh.
    ///
    /// The walkable parameters are in world units. Polygon flags are taken
    /// from `mesh.flags`; a polygon without flags never passes a filter.
    pub fn from_recast(
        mesh: &PolyMesh,
        detail: &PolyMeshDetail,
        walkable_height: f32,
        walkable_radius: f32,
        walkable_climb: f32,
    ) -> Result<Self> {
        if mesh.npolys == 0 || mesh.nverts() == 0 {
            return Err(Status::NavMeshInvalid);
        }
        if mesh.nvp > MAX_VERTS_PER_POLY || mesh.nvp < 3 {
            return Err(Status::InvalidParam);
        }
        if mesh.npolys > u16::MAX as usize || mesh.nverts() > u16::MAX as usize {
            return Err(Status::InvalidParam);
        }
        if mesh.areas.len() < mesh.npolys || mesh.flags.len() < mesh.npolys {
            return Err(Status::NavMeshInvalid);
        }
        if !detail.meshes.is_empty() && detail.meshes.len() != mesh.npolys {
            return Err(Status::InvalidParam);
        }

        let salt = next_salt();

        let verts: Vec<Vec3> = mesh
            .verts
            .iter()
            .map(|&[x, y, z]| {
                mesh.bmin + Vec3::new(x as f32 * mesh.cs, y as f32 * mesh.ch, z as f32 * mesh.cs)
            })
            .collect();

        let mut polys = Vec::with_capacity(mesh.npolys);
        let mut links = Vec::new();
        for i in 0..mesh.npolys {
            let mut poly = Poly {
                flags: PolyFlags::from_bits_truncate(mesh.flags[i]),
                area: mesh.areas[i],
                ..Default::default()
            };

            for (j, (&v, &nei)) in mesh.poly(i).iter().zip(mesh.neighbors(i)).enumerate() {
                if v == MESH_NULL_IDX {
                    break;
                }
                if v as usize >= verts.len() {
                    return Err(Status::NavMeshInvalid);
                }
                poly.verts[j] = v;
                poly.vert_count += 1;

                if nei == MESH_NULL_IDX || nei & PORTAL_FLAG != 0 || nei as usize >= mesh.npolys {
                    continue;
                }
                poly.neighbors[j] = nei + 1;
                links.push(Link {
                    reference: PolyRef::encode(salt, nei as usize),
                    edge: j as u8,
                    next: poly.first_link,
                });
                poly.first_link = Some((links.len() - 1) as u32);
            }

            if poly.vert_count < 3 {
                return Err(Status::NavMeshInvalid);
            }
            polys.push(poly);
        }

        let detail_meshes: Vec<PolyDetail> = detail
            .meshes
            .iter()
            .map(|&[vert_base, vert_count, tri_base, tri_count]| PolyDetail {
                vert_base,
                vert_count,
                tri_base,
                tri_count,
            })
            .collect();
        for pd in &detail_meshes {
            if (pd.vert_base + pd.vert_count) as usize > detail.verts.len()
                || (pd.tri_base + pd.tri_count) as usize > detail.tris.len()
            {
                return Err(Status::NavMeshInvalid);
            }
        }

        let mut all_points = verts.clone();
        all_points.extend_from_slice(&detail.verts);
        let (mut bmin, mut bmax) = calc_bounds(&all_points).ok_or(Status::NavMeshInvalid)?;
        // Points at the ground level of a 2D mesh must still reach polygons
        // lifted by the voxel height.
        let pad = Vec3::new(0.0, walkable_climb + mesh.ch, 0.0);
        bmin -= pad;
        bmax += pad;

        let mut nav_mesh = Self {
            salt,
            verts,
            polys,
            links,
            detail_meshes,
            detail_verts: detail.verts.clone(),
            detail_tris: detail.tris.clone(),
            bv_tree: BVTree::default(),
            bmin,
            bmax,
            walkable_height,
            walkable_radius,
            walkable_climb,
        };

        let boxes: Vec<(Vec3, Vec3)> = (0..nav_mesh.polys.len())
            .map(|i| {
                let (lo, hi) = nav_mesh.poly_index_bounds(i);
                (lo - pad, hi + pad)
            })
            .collect();
        nav_mesh.bv_tree = BVTree::build(&boxes, bmin, bmax - bmin, 1.0 / mesh.cs);

        log::debug!(
            "baked nav mesh {}: {} polygons, {} links, {} detail triangles",
            salt,
            nav_mesh.polys.len(),
            nav_mesh.links.len(),
            nav_mesh.detail_tris.len()
        );

        Ok(nav_mesh)
    }

    pub fn salt(&self) -> u16 {
        self.salt
    }

    pub fn poly_count(&self) -> usize {
        self.polys.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.bmin, self.bmax)
    }

    pub fn walkable_height(&self) -> f32 {
        self.walkable_height
    }

    pub fn walkable_radius(&self) -> f32 {
        self.walkable_radius
    }

    pub fn walkable_climb(&self) -> f32 {
        self.walkable_climb
    }

    pub fn bv_tree(&self) -> &BVTree {
        &self.bv_tree
    }

    /// Reference of the polygon at `index` in this bake
    pub fn poly_ref(&self, index: usize) -> PolyRef {
        PolyRef::encode(self.salt, index)
    }

    pub fn poly_refs(&self) -> impl Iterator<Item = PolyRef> + '_ {
        (0..self.polys.len()).map(|i| self.poly_ref(i))
    }

    pub fn is_valid_poly_ref(&self, reference: PolyRef) -> bool {
        self.get_poly(reference).is_ok()
    }

    pub fn get_poly(&self, reference: PolyRef) -> Result<&Poly> {
        if !reference.is_valid() {
            return Err(Status::InvalidParam);
        }
        if reference.salt() != self.salt {
            return Err(Status::StaleReference);
        }
        self.polys.get(reference.index()).ok_or(Status::InvalidParam)
    }

    /// World space vertices of a polygon
    pub fn poly_vertices(&self, poly: &Poly) -> Vec<Vec3> {
        poly.vertex_indices()
            .iter()
            .map(|&v| self.verts[v as usize])
            .collect()
    }

    /// Links leaving `poly`
    pub fn links<'a>(&'a self, poly: &Poly) -> impl Iterator<Item = &'a Link> + 'a {
        let mut next = poly.first_link;
        std::iter::from_fn(move || {
            let link = self.links.get(next? as usize)?;
            next = link.next;
            Some(link)
        })
    }

    /// Link of `poly` leading to `to`
    pub fn find_link(&self, poly: &Poly, to: PolyRef) -> Option<&Link> {
        self.links(poly).find(|link| link.reference == to)
    }

    pub fn get_poly_center(&self, reference: PolyRef) -> Result<Vec3> {
        let poly = self.get_poly(reference)?;
        let verts = self.poly_vertices(poly);
        Ok(verts.iter().copied().sum::<Vec3>() / verts.len() as f32)
    }

    /// Bounds of the polygon including its detail surface
    pub fn get_poly_bounds(&self, reference: PolyRef) -> Result<(Vec3, Vec3)> {
        self.get_poly(reference)?;
        Ok(self.poly_index_bounds(reference.index()))
    }

    fn poly_index_bounds(&self, index: usize) -> (Vec3, Vec3) {
        let poly = &self.polys[index];
        let mut points = self.poly_vertices(poly);
        if let Some(pd) = self.detail_meshes.get(index) {
            let base = pd.vert_base as usize;
            points.extend_from_slice(&self.detail_verts[base..base + pd.vert_count as usize]);
        }
        calc_bounds(&points).unwrap_or((Vec3::ZERO, Vec3::ZERO))
    }

    /// Polygons whose bounds overlap `bmin..bmax` and pass `filter`
    pub fn query_polygons(&self, bmin: Vec3, bmax: Vec3, filter: &QueryFilter) -> Vec<PolyRef> {
        self.bv_tree
            .query(bmin, bmax)
            .into_iter()
            .filter(|&i| filter.pass_filter(&self.polys[i]))
            .map(|i| self.poly_ref(i))
            .collect()
    }

    /// Detail triangles of a polygon in world space
    pub fn detail_triangles(&self, reference: PolyRef) -> Result<Vec<[Vec3; 3]>> {
        let poly = self.get_poly(reference)?;
        let Some(pd) = self.detail_meshes.get(reference.index()) else {
            // no detail mesh, fan over the polygon
            let verts = self.poly_vertices(poly);
            return Ok((2..verts.len()).map(|k| [verts[0], verts[k - 1], verts[k]]).collect());
        };

        let base = pd.vert_base as usize;
        let tris = &self.detail_tris[pd.tri_base as usize..(pd.tri_base + pd.tri_count) as usize];
        Ok(tris
            .iter()
            .map(|t| {
                [
                    self.detail_verts[base + t[0] as usize],
                    self.detail_verts[base + t[1] as usize],
                    self.detail_verts[base + t[2] as usize],
                ]
            })
            .collect())
    }

    /// Detail triangle edges that lie on the polygon outline
    pub(crate) fn detail_boundary_edges(&self, reference: PolyRef) -> Result<Vec<(Vec3, Vec3)>> {
        let poly = self.get_poly(reference)?;
        let Some(pd) = self.detail_meshes.get(reference.index()) else {
            let verts = self.poly_vertices(poly);
            let n = verts.len();
            return Ok((0..n).map(|i| (verts[i], verts[(i + 1) % n])).collect());
        };

        let base = pd.vert_base as usize;
        let tris = &self.detail_tris[pd.tri_base as usize..(pd.tri_base + pd.tri_count) as usize];
        let mut edges = Vec::new();
        for t in tris {
            for k in 0..3 {
                if (t[3] >> (k * 2)) & 0x3 != 0 {
                    edges.push((
                        self.detail_verts[base + t[k] as usize],
                        self.detail_verts[base + t[(k + 1) % 3] as usize],
                    ));
                }
            }
        }
        Ok(edges)
    }

    /// Height of the detail surface at the XZ location of `pos`.
    ///
    /// Returns `None` when `pos` is not over the polygon.
    pub fn get_poly_height(&self, reference: PolyRef, pos: Vec3) -> Result<Option<f32>> {
        let poly = self.get_poly(reference)?;
        if !point_in_polygon_2d(pos, &self.poly_vertices(poly)) {
            return Ok(None);
        }

        Ok(self
            .detail_triangles(reference)?
            .iter()
            .find_map(|&[a, b, c]| closest_height_point_triangle(pos, a, b, c)))
    }

    pub fn set_poly_flags(&mut self, reference: PolyRef, flags: PolyFlags) -> Result<()> {
        self.get_poly(reference)?;
        self.polys[reference.index()].flags = flags;
        Ok(())
    }

    pub fn get_poly_flags(&self, reference: PolyRef) -> Result<PolyFlags> {
        Ok(self.get_poly(reference)?.flags)
    }

    pub fn set_poly_area(&mut self, reference: PolyRef, area: u8) -> Result<()> {
        self.get_poly(reference)?;
        self.polys[reference.index()].area = area;
        Ok(())
    }

    pub fn get_poly_area(&self, reference: PolyRef) -> Result<u8> {
        Ok(self.get_poly(reference)?.area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mesh_helpers::{grid_mesh, grid_nav_mesh};

    #[test]
    fn test_bake_grid() -> Result<()> {
        let nav_mesh = grid_nav_mesh(3, 2)?;
        assert_eq!(nav_mesh.poly_count(), 6);
        // interior edges of a 3x2 grid: 4 vertical + 3 horizontal, both ways
        assert_eq!(nav_mesh.link_count(), 14);

        let corner = nav_mesh.poly_ref(0);
        let poly = nav_mesh.get_poly(corner)?;
        assert_eq!(poly.vert_count, 4);
        assert_eq!(nav_mesh.links(poly).count(), 2);
        assert_eq!(poly.flags, PolyFlags::WALK);
        Ok(())
    }

    #[test]
    fn test_links_are_symmetric() -> Result<()> {
        let nav_mesh = grid_nav_mesh(3, 3)?;
        for r in nav_mesh.poly_refs() {
            let poly = nav_mesh.get_poly(r)?;
            for link in nav_mesh.links(poly) {
                let other = nav_mesh.get_poly(link.reference)?;
                assert!(nav_mesh.find_link(other, r).is_some());
            }
        }
        Ok(())
    }

    #[test]
    fn test_stale_reference() -> Result<()> {
        let first = grid_nav_mesh(2, 2)?;
        let second = grid_nav_mesh(2, 2)?;
        assert_ne!(first.salt(), second.salt());

        let old = first.poly_ref(1);
        assert!(first.is_valid_poly_ref(old));
        assert_eq!(second.get_poly(old).err(), Some(Status::StaleReference));
        assert_eq!(
            second.get_poly(PolyRef::NULL).err(),
            Some(Status::InvalidParam)
        );
        assert_eq!(
            second.get_poly(second.poly_ref(99)).err(),
            Some(Status::InvalidParam)
        );
        Ok(())
    }

    #[test]
    fn test_query_polygons() -> Result<()> {
        let nav_mesh = grid_nav_mesh(4, 4)?;
        let filter = QueryFilter::default();

        let center = Vec3::new(2.5, 0.0, 1.5);
        let found = nav_mesh.query_polygons(center - Vec3::splat(0.2), center + Vec3::splat(0.2), &filter);
        assert!(found.iter().any(|&r| r.index() == 6));

        let none = nav_mesh.query_polygons(Vec3::splat(50.0), Vec3::splat(60.0), &filter);
        assert!(none.is_empty());
        Ok(())
    }

    #[test]
    fn test_poly_height_and_flags() -> Result<()> {
        let mut nav_mesh = grid_nav_mesh(2, 1)?;
        let r = nav_mesh.poly_ref(0);

        let h = nav_mesh.get_poly_height(r, Vec3::new(0.5, 0.0, 0.5))?;
        assert!(h.is_some_and(|h| (h - 0.2).abs() < 1e-5));
        assert_eq!(nav_mesh.get_poly_height(r, Vec3::new(1.5, 0.0, 0.5))?, None);

        nav_mesh.set_poly_flags(r, PolyFlags::DISABLED)?;
        assert_eq!(nav_mesh.get_poly_flags(r)?, PolyFlags::DISABLED);
        let found = nav_mesh.query_polygons(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0), &QueryFilter {
            exclude_flags: PolyFlags::DISABLED,
            ..Default::default()
        });
        assert_eq!(found, vec![nav_mesh.poly_ref(1)]);
        Ok(())
    }

    #[test]
    fn test_rejects_empty_mesh() {
        let (mut mesh, detail) = grid_mesh(1, 1);
        mesh.npolys = 0;
        assert_eq!(
            NavMesh::from_recast(&mesh, &detail, 2.0, 0.6, 0.9).err(),
            Some(Status::NavMeshInvalid)
        );
    }

    #[test]
    fn test_boundary_edges() -> Result<()> {
        let nav_mesh = grid_nav_mesh(1, 1)?;
        let edges = nav_mesh.detail_boundary_edges(nav_mesh.poly_ref(0))?;
        // the diagonal of the quad is not an outline edge
        assert_eq!(edges.len(), 4);
        Ok(())
    }
}
