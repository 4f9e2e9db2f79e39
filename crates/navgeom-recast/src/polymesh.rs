//! Convex polygon mesh built from region contours
//!
//! Each contour is ear-clipped into triangles, which are then greedily merged
//! into convex polygons of at most `nvp` vertices. Shared vertices are welded
//! and polygon adjacency is stored next to the vertex indices.

use std::collections::HashMap;

use glam::Vec3;

use navgeom_common::{Error, Result};

use crate::contour::{ContourSet, RC_BORDER_VERTEX};
use crate::context::{BuildContext, TimerCategory};
use crate::predicates::{intersect, intersect_prop, left, left_on, next, prev, vequal, GridVertex};

/// Unused vertex or neighbor slot
pub const MESH_NULL_IDX: u16 = 0xffff;

/// Ear flag stored in the high bit of a triangulation index
const EAR_FLAG: u32 = 0x8000_0000;
const INDEX_MASK: u32 = 0x0fff_ffff;

/// Polygon mesh in grid coordinates.
///
/// `polys` holds `2 * nvp` entries per polygon: the vertex indices padded
/// with `MESH_NULL_IDX`, then the neighbor polygon across each edge.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PolyMesh {
    /// Vertices as `[x, y, z]` cell coordinates
    pub verts: Vec<[u16; 3]>,
    pub polys: Vec<u16>,
    /// Region of each polygon
    pub regs: Vec<u16>,
    /// Area id of each polygon
    pub areas: Vec<u8>,
    /// User flags of each polygon
    pub flags: Vec<u16>,
    pub npolys: usize,
    /// Maximum vertices per polygon
    pub nvp: usize,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cs: f32,
    pub ch: f32,
    pub border_size: i32,
    pub max_edge_error: f32,
}

impl PolyMesh {
    pub fn nverts(&self) -> usize {
        self.verts.len()
    }

    /// Vertex slots of polygon `i`, including padding
    pub fn poly(&self, i: usize) -> &[u16] {
        let start = i * self.nvp * 2;
        &self.polys[start..start + self.nvp]
    }

    /// Neighbor slots of polygon `i`; `MESH_NULL_IDX` marks a solid edge
    pub fn neighbors(&self, i: usize) -> &[u16] {
        let start = i * self.nvp * 2 + self.nvp;
        &self.polys[start..start + self.nvp]
    }

    pub fn poly_vertex_count(&self, i: usize) -> usize {
        count_poly_verts(self.poly(i))
    }

    /// Converts contours into convex polygons with at most `nvp` vertices
    pub fn build(ctx: &mut BuildContext, cset: &ContourSet, nvp: usize) -> Result<Self> {
        if nvp < 3 {
            return Err(Error::NavMeshGeneration(format!(
                "polygons need at least 3 vertices, got {}",
                nvp
            )));
        }

        ctx.timed(TimerCategory::PolyMesh, |ctx| -> Result<Self> {
            let mut mesh = PolyMesh {
                nvp,
                bmin: cset.bmin,
                bmax: cset.bmax,
                cs: cset.cs,
                ch: cset.ch,
                border_size: cset.border_size,
                max_edge_error: cset.max_error,
                ..Default::default()
            };

            let max_vertices: usize = cset
                .contours
                .iter()
                .filter(|c| c.verts.len() >= 3)
                .map(|c| c.verts.len())
                .sum();
            if max_vertices >= 0xfffe {
                return Err(Error::NavMeshGeneration(format!(
                    "too many vertices: {}",
                    max_vertices
                )));
            }

            let mut welder = VertexWelder::default();
            let mut border_vertices = Vec::new();

            for (ci, contour) in cset.contours.iter().enumerate() {
                let nv = contour.verts.len();
                if nv < 3 {
                    continue;
                }

                let mut tris = Vec::new();
                if !triangulate(&contour.verts, &mut tris) {
                    ctx.log_warning(format!("contour {} triangulated only partially", ci));
                }

                let indices: Vec<u16> = contour
                    .verts
                    .iter()
                    .map(|v| {
                        let index = welder.add(&mut mesh.verts, v);
                        if v[3] & RC_BORDER_VERTEX != 0 {
                            border_vertices.push(index);
                        }
                        index
                    })
                    .collect();

                let mut polys: Vec<Vec<u16>> = tris
                    .iter()
                    .filter(|t| t[0] != t[1] && t[0] != t[2] && t[1] != t[2])
                    .map(|t| {
                        let mut p = vec![MESH_NULL_IDX; nvp];
                        for k in 0..3 {
                            p[k] = indices[t[k]];
                        }
                        p
                    })
                    .collect();

                if nvp > 3 {
                    merge_polygons(&mut polys, &mesh.verts, nvp);
                }

                for p in polys {
                    mesh.polys.extend_from_slice(&p);
                    mesh.polys.extend(std::iter::repeat(MESH_NULL_IDX).take(nvp));
                    mesh.regs.push(contour.reg);
                    mesh.areas.push(contour.area);
                    mesh.npolys += 1;
                }
                if mesh.npolys >= 0xfffe {
                    return Err(Error::NavMeshGeneration(format!(
                        "too many polygons: {}",
                        mesh.npolys
                    )));
                }
            }

            if !border_vertices.is_empty() {
                ctx.log_debug(format!("{} border vertices kept", border_vertices.len()));
            }

            build_mesh_adjacency(&mut mesh);
            mesh.mark_portal_edges(cset.width, cset.height);
            mesh.flags = vec![0; mesh.npolys];

            ctx.log_debug(format!(
                "poly mesh: {} vertices, {} polygons",
                mesh.nverts(),
                mesh.npolys
            ));
            Ok(mesh)
        })
    }

    /// Marks open edges on the tile border with the side they face
    fn mark_portal_edges(&mut self, width: i32, height: i32) {
        if self.border_size <= 0 {
            return;
        }
        let nvp = self.nvp;
        for i in 0..self.npolys {
            let nv = self.poly_vertex_count(i);
            for j in 0..nv {
                let base = i * nvp * 2;
                if self.polys[base + nvp + j] != MESH_NULL_IDX {
                    continue;
                }
                let va = self.verts[self.polys[base + j] as usize];
                let vb = self.verts[self.polys[base + next(j, nv)] as usize];

                let side = if va[0] == 0 && vb[0] == 0 {
                    Some(0)
                } else if va[2] as i32 == height && vb[2] as i32 == height {
                    Some(1)
                } else if va[0] as i32 == width && vb[0] as i32 == width {
                    Some(2)
                } else if va[2] == 0 && vb[2] == 0 {
                    Some(3)
                } else {
                    None
                };
                if let Some(side) = side {
                    self.polys[base + nvp + j] = 0x8000 | side;
                }
            }
        }
    }
}

/// Deduplicates vertices sharing a grid column within two height units
#[derive(Debug, Default)]
struct VertexWelder {
    buckets: HashMap<(u16, u16), Vec<u16>>,
}

impl VertexWelder {
    fn add(&mut self, verts: &mut Vec<[u16; 3]>, v: &GridVertex) -> u16 {
        let x = v[0].clamp(0, 0xffff) as u16;
        let y = v[1].clamp(0, 0xffff) as u16;
        let z = v[2].clamp(0, 0xffff) as u16;

        let bucket = self.buckets.entry((x, z)).or_default();
        if let Some(&existing) = bucket
            .iter()
            .find(|&&i| (verts[i as usize][1] as i32 - y as i32).abs() <= 2)
        {
            return existing;
        }

        let index = verts.len() as u16;
        verts.push([x, y, z]);
        bucket.push(index);
        index
    }
}

fn count_poly_verts(p: &[u16]) -> usize {
    p.iter().position(|&v| v == MESH_NULL_IDX).unwrap_or(p.len())
}

fn diagonalie(i: usize, j: usize, verts: &[GridVertex], indices: &[u32], loose: bool) -> bool {
    let n = indices.len();
    let at = |k: usize| &verts[(indices[k] & INDEX_MASK) as usize];
    let d0 = at(i);
    let d1 = at(j);

    for k in 0..n {
        let k1 = next(k, n);
        if k == i || k1 == i || k == j || k1 == j {
            continue;
        }
        let p0 = at(k);
        let p1 = at(k1);
        if vequal(d0, p0) || vequal(d1, p0) || vequal(d0, p1) || vequal(d1, p1) {
            continue;
        }
        let crosses = if loose {
            intersect_prop(d0, d1, p0, p1)
        } else {
            intersect(d0, d1, p0, p1)
        };
        if crosses {
            return false;
        }
    }
    true
}

fn in_cone(i: usize, j: usize, verts: &[GridVertex], indices: &[u32], loose: bool) -> bool {
    let n = indices.len();
    let at = |k: usize| &verts[(indices[k] & INDEX_MASK) as usize];
    let pi = at(i);
    let pj = at(j);
    let pi1 = at(next(i, n));
    let pin1 = at(prev(i, n));

    if left_on(pin1, pi, pi1) {
        if loose {
            return left_on(pi, pj, pin1) && left_on(pj, pi, pi1);
        }
        return left(pi, pj, pin1) && left(pj, pi, pi1);
    }
    !(left_on(pi, pj, pi1) && left_on(pj, pi, pin1))
}

/// `i..j` is a diagonal strictly inside the polygon
fn diagonal(i: usize, j: usize, verts: &[GridVertex], indices: &[u32]) -> bool {
    in_cone(i, j, verts, indices, false) && diagonalie(i, j, verts, indices, false)
}

fn diagonal_loose(i: usize, j: usize, verts: &[GridVertex], indices: &[u32]) -> bool {
    in_cone(i, j, verts, indices, true) && diagonalie(i, j, verts, indices, true)
}

fn edge_len_sqr(a: &GridVertex, b: &GridVertex) -> i64 {
    let dx = (b[0] - a[0]) as i64;
    let dz = (b[2] - a[2]) as i64;
    dx * dx + dz * dz
}

/// Ear clips the contour, shortest diagonal first.
///
/// Triangles index into `verts`. Returns false when the outline could not
/// be fully triangulated; the triangles found so far are kept.
fn triangulate(verts: &[GridVertex], tris: &mut Vec<[usize; 3]>) -> bool {
    let mut indices: Vec<u32> = (0..verts.len() as u32).collect();
    let at = |indices: &[u32], k: usize| &verts[(indices[k] & INDEX_MASK) as usize];

    for i in 0..indices.len() {
        let n = indices.len();
        let i1 = next(i, n);
        let i2 = next(i1, n);
        if diagonal(i, i2, verts, &indices) {
            indices[i1] |= EAR_FLAG;
        }
    }

    while indices.len() > 3 {
        let n = indices.len();
        let mut best: Option<(usize, i64)> = None;
        for i in 0..n {
            let i1 = next(i, n);
            if indices[i1] & EAR_FLAG != 0 {
                let len = edge_len_sqr(at(&indices, i), at(&indices, next(i1, n)));
                if best.map_or(true, |(_, b)| len < b) {
                    best = Some((i, len));
                }
            }
        }

        if best.is_none() {
            // Overlapping segments; accept touching diagonals
            for i in 0..n {
                let i1 = next(i, n);
                let i2 = next(i1, n);
                if diagonal_loose(i, i2, verts, &indices) {
                    let len = edge_len_sqr(at(&indices, i), at(&indices, i2));
                    if best.map_or(true, |(_, b)| len < b) {
                        best = Some((i, len));
                    }
                }
            }
        }

        let Some((i, _)) = best else {
            return false;
        };

        let i1 = next(i, n);
        let i2 = next(i1, n);
        tris.push([
            (indices[i] & INDEX_MASK) as usize,
            (indices[i1] & INDEX_MASK) as usize,
            (indices[i2] & INDEX_MASK) as usize,
        ]);

        indices.remove(i1);
        let n = indices.len();
        let i1 = if i1 >= n { 0 } else { i1 };
        let i = prev(i1, n);

        if diagonal(prev(i, n), i1, verts, &indices) {
            indices[i] |= EAR_FLAG;
        } else {
            indices[i] &= INDEX_MASK;
        }
        if diagonal(i, next(i1, n), verts, &indices) {
            indices[i1] |= EAR_FLAG;
        } else {
            indices[i1] &= INDEX_MASK;
        }
    }

    tris.push([
        (indices[0] & INDEX_MASK) as usize,
        (indices[1] & INDEX_MASK) as usize,
        (indices[2] & INDEX_MASK) as usize,
    ]);
    true
}

fn uleft(a: &[u16; 3], b: &[u16; 3], c: &[u16; 3]) -> bool {
    (b[0] as i32 - a[0] as i32) * (c[2] as i32 - a[2] as i32)
        - (c[0] as i32 - a[0] as i32) * (b[2] as i32 - a[2] as i32)
        < 0
}

/// Squared length of the shared edge when `pa` and `pb` can merge into a
/// convex polygon, with the edge index in each
fn poly_merge_value(pa: &[u16], pb: &[u16], verts: &[[u16; 3]], nvp: usize) -> Option<(i32, usize, usize)> {
    let na = count_poly_verts(pa);
    let nb = count_poly_verts(pb);
    if na + nb - 2 > nvp {
        return None;
    }

    let ordered = |a: u16, b: u16| if a > b { (b, a) } else { (a, b) };
    let (ea, eb) = (0..na).find_map(|i| {
        let edge_a = ordered(pa[i], pa[(i + 1) % na]);
        (0..nb)
            .find(|&j| ordered(pb[j], pb[(j + 1) % nb]) == edge_a)
            .map(|j| (i, j))
    })?;

    let v = |i: u16| &verts[i as usize];
    if !uleft(v(pa[(ea + na - 1) % na]), v(pa[ea]), v(pb[(eb + 2) % nb])) {
        return None;
    }
    if !uleft(v(pb[(eb + nb - 1) % nb]), v(pb[eb]), v(pa[(ea + 2) % na])) {
        return None;
    }

    let a = v(pa[ea]);
    let b = v(pa[(ea + 1) % na]);
    let dx = a[0] as i32 - b[0] as i32;
    let dz = a[2] as i32 - b[2] as i32;
    Some((dx * dx + dz * dz, ea, eb))
}

fn merge_poly_verts(pa: &[u16], pb: &[u16], ea: usize, eb: usize, nvp: usize) -> Vec<u16> {
    let na = count_poly_verts(pa);
    let nb = count_poly_verts(pb);
    let mut merged = Vec::with_capacity(nvp);
    merged.extend((0..na - 1).map(|i| pa[(ea + 1 + i) % na]));
    merged.extend((0..nb - 1).map(|i| pb[(eb + 1 + i) % nb]));
    merged.resize(nvp, MESH_NULL_IDX);
    merged
}

/// Repeatedly merges the pair sharing the longest edge
fn merge_polygons(polys: &mut Vec<Vec<u16>>, verts: &[[u16; 3]], nvp: usize) {
    loop {
        let mut best: Option<(i32, usize, usize, usize, usize)> = None;
        for j in 0..polys.len() {
            for k in j + 1..polys.len() {
                if let Some((value, ea, eb)) = poly_merge_value(&polys[j], &polys[k], verts, nvp) {
                    if best.map_or(true, |b| value > b.0) {
                        best = Some((value, j, k, ea, eb));
                    }
                }
            }
        }

        let Some((_, pa, pb, ea, eb)) = best else {
            break;
        };
        polys[pa] = merge_poly_verts(&polys[pa], &polys[pb], ea, eb, nvp);
        polys.swap_remove(pb);
    }
}

/// Fills the neighbor slots of every polygon edge shared by two polygons
fn build_mesh_adjacency(mesh: &mut PolyMesh) {
    let nvp = mesh.nvp;
    // (poly, edge) of each edge stored with its lower vertex first
    let mut open_edges: HashMap<(u16, u16), Vec<(usize, usize)>> = HashMap::new();

    for i in 0..mesh.npolys {
        let p = mesh.poly(i);
        let nv = count_poly_verts(p);
        for j in 0..nv {
            let v0 = p[j];
            let v1 = p[next(j, nv)];
            if v0 < v1 {
                open_edges.entry((v0, v1)).or_default().push((i, j));
            }
        }
    }

    let mut links = Vec::new();
    for i in 0..mesh.npolys {
        let p = mesh.poly(i);
        let nv = count_poly_verts(p);
        for j in 0..nv {
            let v0 = p[j];
            let v1 = p[next(j, nv)];
            if v0 > v1 {
                if let Some(candidates) = open_edges.get_mut(&(v1, v0)) {
                    if let Some(pos) = candidates.iter().position(|&(other, _)| other != i) {
                        let (other, edge) = candidates.remove(pos);
                        links.push((i, j, other, edge));
                    }
                }
            }
        }
    }

    for (a, ea, b, eb) in links {
        mesh.polys[a * nvp * 2 + nvp + ea] = b as u16;
        mesh.polys[b * nvp * 2 + nvp + eb] = a as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::Contour;

    fn square_contour(reg: u16, x0: i32, size: i32) -> Contour {
        // outlines run clockwise when seen from above
        Contour {
            verts: vec![
                [x0, 0, 0, 0],
                [x0, 0, size, 0],
                [x0 + size, 0, size, 0],
                [x0 + size, 0, 0, 0],
            ],
            raw_verts: Vec::new(),
            reg,
            area: 63,
        }
    }

    fn cset(contours: Vec<Contour>) -> ContourSet {
        ContourSet {
            contours,
            cs: 1.0,
            ch: 1.0,
            width: 20,
            height: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_triangulate_square() {
        let verts = square_contour(1, 0, 4).verts;
        let mut tris = Vec::new();
        assert!(triangulate(&verts, &mut tris));
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn test_triangulate_concave() {
        // L shape
        let verts: Vec<GridVertex> = vec![
            [0, 0, 0, 0],
            [0, 0, 4, 0],
            [2, 0, 4, 0],
            [2, 0, 2, 0],
            [4, 0, 2, 0],
            [4, 0, 0, 0],
        ];
        let mut tris = Vec::new();
        assert!(triangulate(&verts, &mut tris));
        assert_eq!(tris.len(), 4);
    }

    #[test]
    fn test_square_becomes_one_polygon() -> Result<()> {
        let mut ctx = BuildContext::new();
        let mesh = PolyMesh::build(&mut ctx, &cset(vec![square_contour(1, 0, 4)]), 6)?;

        assert_eq!(mesh.npolys, 1);
        assert_eq!(mesh.nverts(), 4);
        assert_eq!(mesh.poly_vertex_count(0), 4);
        assert!(mesh.neighbors(0).iter().all(|&n| n == MESH_NULL_IDX));
        assert_eq!(mesh.flags, vec![0]);
        assert_eq!(ctx.timer_count(TimerCategory::PolyMesh), 1);
        Ok(())
    }

    #[test]
    fn test_triangles_only() -> Result<()> {
        let mesh = PolyMesh::build(&mut BuildContext::new(), &cset(vec![square_contour(1, 0, 4)]), 3)?;
        assert_eq!(mesh.npolys, 2);
        // the diagonal is shared
        assert!(mesh.neighbors(0).contains(&1));
        assert!(mesh.neighbors(1).contains(&0));
        Ok(())
    }

    #[test]
    fn test_adjacent_regions_share_vertices() -> Result<()> {
        let contours = vec![square_contour(1, 0, 4), square_contour(2, 4, 4)];
        let mesh = PolyMesh::build(&mut BuildContext::new(), &cset(contours), 6)?;

        assert_eq!(mesh.npolys, 2);
        assert_eq!(mesh.nverts(), 6);
        assert!(mesh.neighbors(0).contains(&1));
        assert_eq!(mesh.regs, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_rejects_small_nvp() {
        assert!(PolyMesh::build(&mut BuildContext::new(), &cset(Vec::new()), 2).is_err());
    }
}
