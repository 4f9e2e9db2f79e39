//! Height detail for the polygon mesh
//!
//! The polygon mesh only knows heights at its vertices. For every polygon the
//! compact heightfield is sampled along the edges and inside, and the samples
//! that deviate most from the current surface are added until the triangle
//! mesh stays within `sample_max_error` of the voxel data.

use glam::Vec3;

use navgeom_common::{dist_point_segment_sqr_2d, point_in_polygon_2d, Result};

use crate::compact_heightfield::CompactHeightfield;
use crate::context::{BuildContext, TimerCategory};
use crate::polymesh::{PolyMesh, MESH_NULL_IDX};

const UNSET_HEIGHT: u16 = 0xffff;
const MAX_VERTS: usize = 127;
const MAX_TRIS: usize = 255;
const MAX_VERTS_PER_EDGE: usize = 32;

const EDGE_UNDEF: i32 = -1;
const EDGE_HULL: i32 = -2;

/// Triangulated height surface, one sub-mesh per polygon
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PolyMeshDetail {
    /// Per polygon: first vertex, vertex count, first triangle, triangle count
    pub meshes: Vec<[u32; 4]>,
    /// World space vertices
    pub verts: Vec<Vec3>,
    /// Local vertex indices plus edge flags; bits `2k..2k+1` are set when
    /// edge `k` lies on the polygon outline
    pub tris: Vec<[u8; 4]>,
}

impl PolyMeshDetail {
    pub fn nverts(&self) -> usize {
        self.verts.len()
    }

    pub fn ntris(&self) -> usize {
        self.tris.len()
    }

    /// Vertices and triangles of the sub-mesh for polygon `i`
    pub fn sub_mesh(&self, i: usize) -> Option<(&[Vec3], &[[u8; 4]])> {
        let [vbase, nverts, tbase, ntris] = *self.meshes.get(i)?;
        let verts = self.verts.get(vbase as usize..(vbase + nverts) as usize)?;
        let tris = self.tris.get(tbase as usize..(tbase + ntris) as usize)?;
        Some((verts, tris))
    }

    /// Builds the detail mesh of every polygon in `mesh`.
    ///
    /// `sample_dist` is in world units; 0 disables sampling so only the
    /// polygon outline is triangulated.
    pub fn build(
        ctx: &mut BuildContext,
        mesh: &PolyMesh,
        chf: &CompactHeightfield,
        sample_dist: f32,
        sample_max_error: f32,
    ) -> Result<Self> {
        ctx.timed(TimerCategory::DetailMesh, |ctx| -> Result<Self> {
            let mut dmesh = Self::default();
            if mesh.nverts() == 0 || mesh.npolys == 0 {
                return Ok(dmesh);
            }

            let search_radius = (mesh.max_edge_error.ceil() as i32).max(1);
            let orig = mesh.bmin;

            for i in 0..mesh.npolys {
                let poly = mesh.poly(i);
                let nv = mesh.poly_vertex_count(i);

                let outline: Vec<Vec3> = poly[..nv]
                    .iter()
                    .map(|&v| {
                        let v = mesh.verts[v as usize];
                        Vec3::new(v[0] as f32 * chf.cs, v[1] as f32 * chf.ch, v[2] as f32 * chf.cs)
                    })
                    .collect();

                let hp = HeightPatch::gather(chf, mesh, poly, mesh.regs[i]);
                let (mut verts, tris) = build_poly_detail(
                    ctx,
                    &outline,
                    sample_dist,
                    sample_max_error,
                    search_radius,
                    chf,
                    &hp,
                );

                for v in verts.iter_mut() {
                    *v += orig;
                    v.y += chf.ch;
                }
                let outline: Vec<Vec3> = outline.into_iter().map(|v| v + orig).collect();

                dmesh.meshes.push([
                    dmesh.verts.len() as u32,
                    verts.len() as u32,
                    dmesh.tris.len() as u32,
                    tris.len() as u32,
                ]);
                for t in &tris {
                    let flags = tri_edge_flags(verts[t[0]], verts[t[1]], verts[t[2]], &outline);
                    dmesh.tris.push([t[0] as u8, t[1] as u8, t[2] as u8, flags]);
                }
                dmesh.verts.extend(verts);
            }

            ctx.log_debug(format!(
                "detail mesh: {} vertices, {} triangles",
                dmesh.nverts(),
                dmesh.ntris()
            ));
            Ok(dmesh)
        })
    }
}

/// Floor heights of one polygon's bounding rectangle, in cells
struct HeightPatch {
    xmin: i32,
    zmin: i32,
    width: i32,
    height: i32,
    data: Vec<u16>,
}

impl HeightPatch {
    fn get(&self, x: i32, z: i32) -> u16 {
        self.data[(x + z * self.width) as usize]
    }

    /// Collects the heights under the polygon from spans of its region, then
    /// floods outward to fill the rest of the rectangle
    fn gather(chf: &CompactHeightfield, mesh: &PolyMesh, poly: &[u16], region: u16) -> Self {
        let mut xmin = chf.width;
        let mut xmax = 0;
        let mut zmin = chf.height;
        let mut zmax = 0;
        for &v in poly.iter().take_while(|&&v| v != MESH_NULL_IDX) {
            let v = mesh.verts[v as usize];
            xmin = xmin.min(v[0] as i32);
            xmax = xmax.max(v[0] as i32);
            zmin = zmin.min(v[2] as i32);
            zmax = zmax.max(v[2] as i32);
        }
        let xmin = (xmin - 1).max(0);
        let xmax = (xmax + 1).min(chf.width);
        let zmin = (zmin - 1).max(0);
        let zmax = (zmax + 1).min(chf.height);
        let width = (xmax - xmin).max(1);
        let height = (zmax - zmin).max(1);

        let mut hp = HeightPatch {
            xmin,
            zmin,
            width,
            height,
            data: vec![UNSET_HEIGHT; (width * height) as usize],
        };

        let bs = chf.border_size;
        let mut queue: Vec<(i32, i32, usize)> = Vec::new();

        for hz in 0..height {
            let z = zmin + hz + bs;
            for hx in 0..width {
                let x = xmin + hx + bs;
                if x >= chf.width || z >= chf.height {
                    continue;
                }
                for i in chf.cell(x, z).spans() {
                    if chf.spans[i].reg != region {
                        continue;
                    }
                    hp.data[(hx + hz * width) as usize] = chf.spans[i].y;

                    // Spans on the region outline seed the flood
                    let on_border = (0..4).any(|dir| {
                        chf.neighbor(x, z, i, dir)
                            .is_some_and(|(_, _, ai)| chf.spans[ai].reg != region)
                    });
                    if on_border {
                        queue.push((x, z, i));
                    }
                }
            }
        }

        if hp.data.iter().all(|&h| h == UNSET_HEIGHT) {
            hp.seed_from_vertices(chf, mesh, poly, &mut queue);
        }

        let mut head = 0;
        while head < queue.len() {
            let (cx, cz, ci) = queue[head];
            head += 1;

            for dir in 0..4 {
                let Some((ax, az, ai)) = chf.neighbor(cx, cz, ci, dir) else {
                    continue;
                };
                let hx = ax - hp.xmin - bs;
                let hz = az - hp.zmin - bs;
                if hx < 0 || hz < 0 || hx >= hp.width || hz >= hp.height {
                    continue;
                }
                let slot = (hx + hz * hp.width) as usize;
                if hp.data[slot] != UNSET_HEIGHT {
                    continue;
                }
                hp.data[slot] = chf.spans[ai].y;
                queue.push((ax, az, ai));
            }
        }

        hp
    }

    /// Seeds the flood with the span closest in height to a polygon vertex
    fn seed_from_vertices(
        &mut self,
        chf: &CompactHeightfield,
        mesh: &PolyMesh,
        poly: &[u16],
        queue: &mut Vec<(i32, i32, usize)>,
    ) {
        const OFFSETS: [(i32, i32); 9] = [(0, 0), (-1, -1), (0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0)];
        let bs = chf.border_size;

        let mut best: Option<(i32, i32, usize, i32)> = None;
        for &v in poly.iter().take_while(|&&v| v != MESH_NULL_IDX) {
            let v = mesh.verts[v as usize];
            for (ox, oz) in OFFSETS {
                let ax = v[0] as i32 + ox;
                let az = v[2] as i32 + oz;
                if ax < self.xmin || ax >= self.xmin + self.width || az < self.zmin || az >= self.zmin + self.height {
                    continue;
                }
                let (cx, cz) = (ax + bs, az + bs);
                if cx < 0 || cz < 0 || cx >= chf.width || cz >= chf.height {
                    continue;
                }
                for i in chf.cell(cx, cz).spans() {
                    let d = (v[1] as i32 - chf.spans[i].y as i32).abs();
                    if best.map_or(true, |b| d < b.3) {
                        best = Some((cx, cz, i, d));
                    }
                }
            }
        }

        if let Some((x, z, i, _)) = best {
            let slot = ((x - bs - self.xmin) + (z - bs - self.zmin) * self.width) as usize;
            self.data[slot] = chf.spans[i].y;
            queue.push((x, z, i));
        }
    }

    /// Height at a local position; unset cells fall back to the nearest set
    /// cell in a spiral of `radius` rings
    fn height_at(&self, p: Vec3, cs: f32, ch: f32, radius: i32) -> u16 {
        let ics = 1.0 / cs;
        let ix = ((p.x * ics + 0.01).floor() as i32 - self.xmin).clamp(0, self.width - 1);
        let iz = ((p.z * ics + 0.01).floor() as i32 - self.zmin).clamp(0, self.height - 1);

        let mut h = self.get(ix, iz);
        if h != UNSET_HEIGHT {
            return h;
        }

        let (mut x, mut z, mut dx, mut dz) = (1, 0, 1, 0);
        let max_size = radius * 2 + 1;
        let max_iter = max_size * max_size - 1;
        let mut next_ring_start = 8;
        let mut next_ring_iters = 16;
        let mut dmin = f32::MAX;

        for i in 0..max_iter {
            let nx = ix + x;
            let nz = iz + z;
            if nx >= 0 && nz >= 0 && nx < self.width && nz < self.height {
                let nh = self.get(nx, nz);
                if nh != UNSET_HEIGHT {
                    let d = (nh as f32 * ch - p.y).abs();
                    if d < dmin {
                        h = nh;
                        dmin = d;
                    }
                }
            }

            if i + 1 == next_ring_start {
                if h != UNSET_HEIGHT {
                    break;
                }
                next_ring_start += next_ring_iters;
                next_ring_iters += 8;
            }

            if x == z || (x < 0 && x == -z) || (x > 0 && x == 1 - z) {
                let tmp = dx;
                dx = -dz;
                dz = tmp;
            }
            x += dx;
            z += dz;
        }

        h
    }
}

fn vcross2(p1: Vec3, p2: Vec3, p3: Vec3) -> f32 {
    let u1 = p2.x - p1.x;
    let v1 = p2.z - p1.z;
    let u2 = p3.x - p1.x;
    let v2 = p3.z - p1.z;
    u1 * v2 - v1 * u2
}

fn dist2(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    (dx * dx + dz * dz).sqrt()
}

/// Circle through three points on the XZ plane, as center and radius
fn circum_circle(p1: Vec3, p2: Vec3, p3: Vec3) -> (Vec3, f32) {
    const EPS: f32 = 1e-6;
    let v2 = p2 - p1;
    let v3 = p3 - p1;
    let cp = vcross2(Vec3::ZERO, v2, v3);
    if cp.abs() <= EPS {
        return (p1, 0.0);
    }

    let v2sq = v2.x * v2.x + v2.z * v2.z;
    let v3sq = v3.x * v3.x + v3.z * v3.z;
    let c = Vec3::new(
        (v2sq * v3.z - v3sq * v2.z) / (2.0 * cp),
        0.0,
        (v3sq * v2.x - v2sq * v3.x) / (2.0 * cp),
    );
    let r = dist2(c, Vec3::ZERO);
    (c + p1, r)
}

/// Vertical distance from `p` to the triangle below or above it
fn dist_pt_tri(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPS: f32 = 1e-4;
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.x * v0.x + v0.z * v0.z;
    let dot01 = v0.x * v1.x + v0.z * v1.z;
    let dot02 = v0.x * v2.x + v0.z * v2.z;
    let dot11 = v1.x * v1.x + v1.z * v1.z;
    let dot12 = v1.x * v2.x + v1.z * v2.z;

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom == 0.0 {
        return None;
    }
    let inv = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv;
    let v = (dot00 * dot12 - dot01 * dot02) * inv;

    if u >= -EPS && v >= -EPS && u + v <= 1.0 + EPS {
        let y = a.y + v0.y * u + v1.y * v;
        return Some((y - p.y).abs());
    }
    None
}

fn dist_to_tri_mesh(p: Vec3, verts: &[Vec3], tris: &[[usize; 3]]) -> Option<f32> {
    tris.iter()
        .filter_map(|t| dist_pt_tri(p, verts[t[0]], verts[t[1]], verts[t[2]]))
        .min_by(f32::total_cmp)
}

/// Squared distance to the outline, negative inside
fn dist_to_poly(verts: &[Vec3], p: Vec3) -> f32 {
    let n = verts.len();
    let dmin = (0..n)
        .map(|i| dist_point_segment_sqr_2d(p, verts[(i + n - 1) % n], verts[i]).0)
        .fold(f32::MAX, f32::min);
    if point_in_polygon_2d(p, verts) {
        -dmin
    } else {
        dmin
    }
}

/// Squared 3D distance from `p` to segment `a..b`
fn dist_pt_seg_sqr(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let d = ab.length_squared();
    let mut t = ab.dot(p - a);
    if d > 0.0 {
        t /= d;
    }
    (a + ab * t.clamp(0.0, 1.0)).distance_squared(p)
}

/// Smallest of the widths measured from each edge to its farthest vertex
fn poly_min_extent(verts: &[Vec3]) -> f32 {
    let n = verts.len();
    let mut min_dist = f32::MAX;
    for i in 0..n {
        let ni = (i + 1) % n;
        let max_edge_dist = (0..n)
            .filter(|&j| j != i && j != ni)
            .map(|j| dist_point_segment_sqr_2d(verts[j], verts[i], verts[ni]).0)
            .fold(0.0, f32::max);
        min_dist = min_dist.min(max_edge_dist);
    }
    min_dist.sqrt()
}

fn jitter_x(i: usize) -> f32 {
    ((i as u32).wrapping_mul(0x8da6_b343) & 0xffff) as f32 / 65535.0 * 2.0 - 1.0
}

fn jitter_z(i: usize) -> f32 {
    ((i as u32).wrapping_mul(0xd816_3841) & 0xffff) as f32 / 65535.0 * 2.0 - 1.0
}

/// Fans the hull into triangles, starting from the shortest ear on an
/// original polygon vertex and advancing the shorter side each step
fn triangulate_hull(verts: &[Vec3], hull: &[usize], nin: usize, tris: &mut Vec<[usize; 3]>) {
    let nhull = hull.len();
    if nhull < 3 {
        return;
    }
    let prev = |i: usize| (i + nhull - 1) % nhull;
    let next = |i: usize| (i + 1) % nhull;

    let mut start = 0;
    let mut left = 1;
    let mut right = nhull - 1;
    let mut dmin = f32::MAX;
    for i in 0..nhull {
        if hull[i] >= nin {
            continue;
        }
        let (pi, ni) = (prev(i), next(i));
        let pv = verts[hull[pi]];
        let cv = verts[hull[i]];
        let nv = verts[hull[ni]];
        let d = dist2(pv, cv) + dist2(cv, nv) + dist2(nv, pv);
        if d < dmin {
            start = i;
            left = ni;
            right = pi;
            dmin = d;
        }
    }

    tris.push([hull[start], hull[left], hull[right]]);

    while next(left) != right {
        let nleft = next(left);
        let nright = prev(right);

        let cvleft = verts[hull[left]];
        let nvleft = verts[hull[nleft]];
        let cvright = verts[hull[right]];
        let nvright = verts[hull[nright]];
        let dleft = dist2(cvleft, nvleft) + dist2(nvleft, cvright);
        let dright = dist2(cvright, nvright) + dist2(cvleft, nvright);

        if dleft < dright {
            tris.push([hull[left], hull[nleft], hull[right]]);
            left = nleft;
        } else {
            tris.push([hull[left], hull[nright], hull[right]]);
            right = nright;
        }
    }
}

/// Edge of the Delaunay triangulation: endpoints, then the faces to the
/// left and right of `s -> t`
#[derive(Debug, Clone, Copy)]
struct Edge {
    s: usize,
    t: usize,
    left: i32,
    right: i32,
}

struct Delaunay<'a> {
    pts: &'a [Vec3],
    edges: Vec<Edge>,
    max_edges: usize,
    nfaces: i32,
}

impl<'a> Delaunay<'a> {
    fn find_edge(&self, s: usize, t: usize) -> Option<usize> {
        self.edges
            .iter()
            .position(|e| (e.s == s && e.t == t) || (e.s == t && e.t == s))
    }

    fn add_edge(&mut self, s: usize, t: usize, left: i32, right: i32) {
        if self.edges.len() >= self.max_edges || self.find_edge(s, t).is_some() {
            return;
        }
        self.edges.push(Edge { s, t, left, right });
    }

    fn update_left_face(&mut self, e: usize, s: usize, t: usize, face: i32) {
        let edge = &mut self.edges[e];
        if edge.s == s && edge.t == t && edge.left == EDGE_UNDEF {
            edge.left = face;
        } else if edge.t == s && edge.s == t && edge.right == EDGE_UNDEF {
            edge.right = face;
        }
    }

    fn overlap_edges(&self, s1: usize, t1: usize) -> bool {
        self.edges.iter().any(|e| {
            if e.s == s1 || e.s == t1 || e.t == s1 || e.t == t1 {
                return false;
            }
            let (a, b, c, d) = (self.pts[e.s], self.pts[e.t], self.pts[s1], self.pts[t1]);
            let a1 = vcross2(a, b, d);
            let a2 = vcross2(a, b, c);
            if a1 * a2 < 0.0 {
                let a3 = vcross2(c, d, a);
                let a4 = a3 + a2 - a1;
                return a3 * a4 < 0.0;
            }
            false
        })
    }

    fn complete_facet(&mut self, e: usize) {
        const EPS: f32 = 1e-5;
        const TOL: f32 = 0.001;

        let edge = self.edges[e];
        let (s, t) = if edge.left == EDGE_UNDEF {
            (edge.s, edge.t)
        } else if edge.right == EDGE_UNDEF {
            (edge.t, edge.s)
        } else {
            return;
        };

        // Best point on the left of the edge
        let npts = self.pts.len();
        let mut pt = npts;
        let mut c = Vec3::ZERO;
        let mut r = -1.0;
        for u in 0..npts {
            if u == s || u == t {
                continue;
            }
            if vcross2(self.pts[s], self.pts[t], self.pts[u]) <= EPS {
                continue;
            }
            if r < 0.0 {
                pt = u;
                (c, r) = circum_circle(self.pts[s], self.pts[t], self.pts[u]);
                continue;
            }
            let d = dist2(c, self.pts[u]);
            if d > r * (1.0 + TOL) {
                continue;
            }
            if d >= r * (1.0 - TOL) && (self.overlap_edges(s, u) || self.overlap_edges(t, u)) {
                continue;
            }
            pt = u;
            (c, r) = circum_circle(self.pts[s], self.pts[t], self.pts[u]);
        }

        if pt < npts {
            let face = self.nfaces;
            self.update_left_face(e, s, t, face);
            match self.find_edge(pt, s) {
                Some(k) => self.update_left_face(k, pt, s, face),
                None => self.add_edge(pt, s, face, EDGE_UNDEF),
            }
            match self.find_edge(t, pt) {
                Some(k) => self.update_left_face(k, t, pt, face),
                None => self.add_edge(t, pt, face, EDGE_UNDEF),
            }
            self.nfaces += 1;
        } else {
            self.update_left_face(e, s, t, EDGE_HULL);
        }
    }

    /// Delaunay triangulation of `pts` constrained to the hull outline
    fn triangulate(ctx: &mut BuildContext, pts: &'a [Vec3], hull: &[usize]) -> Vec<[usize; 3]> {
        let mut dt = Delaunay {
            pts,
            edges: Vec::new(),
            max_edges: pts.len() * 10,
            nfaces: 0,
        };

        let nhull = hull.len();
        for i in 0..nhull {
            let j = (i + nhull - 1) % nhull;
            dt.add_edge(hull[j], hull[i], EDGE_HULL, EDGE_UNDEF);
        }

        let mut current = 0;
        while current < dt.edges.len() {
            if dt.edges[current].left == EDGE_UNDEF {
                dt.complete_facet(current);
            }
            if dt.edges[current].right == EDGE_UNDEF {
                dt.complete_facet(current);
            }
            current += 1;
        }

        let mut faces: Vec<[Option<usize>; 3]> = vec![[None; 3]; dt.nfaces.max(0) as usize];
        for e in &dt.edges {
            if e.right >= 0 {
                let f = &mut faces[e.right as usize];
                if f[0].is_none() {
                    f[0] = Some(e.s);
                    f[1] = Some(e.t);
                } else if f[0] == Some(e.t) {
                    f[2] = Some(e.s);
                } else if f[1] == Some(e.s) {
                    f[2] = Some(e.t);
                }
            }
            if e.left >= 0 {
                let f = &mut faces[e.left as usize];
                if f[0].is_none() {
                    f[0] = Some(e.t);
                    f[1] = Some(e.s);
                } else if f[0] == Some(e.s) {
                    f[2] = Some(e.t);
                } else if f[1] == Some(e.t) {
                    f[2] = Some(e.s);
                }
            }
        }

        let total = faces.len();
        let tris: Vec<[usize; 3]> = faces
            .into_iter()
            .filter_map(|f| Some([f[0]?, f[1]?, f[2]?]))
            .collect();
        if tris.len() < total {
            ctx.log_warning(format!("removed {} dangling faces", total - tris.len()));
        }
        tris
    }
}

/// Triangulates one polygon: samples the edges, fans the hull and then adds
/// interior samples where the surface error is largest
#[allow(clippy::too_many_arguments)]
fn build_poly_detail(
    ctx: &mut BuildContext,
    input: &[Vec3],
    sample_dist: f32,
    sample_max_error: f32,
    search_radius: i32,
    chf: &CompactHeightfield,
    hp: &HeightPatch,
) -> (Vec<Vec3>, Vec<[usize; 3]>) {
    let nin = input.len();
    let cs = chf.cs;
    let ch = chf.ch;
    let mut verts: Vec<Vec3> = input.to_vec();
    let mut hull: Vec<usize> = Vec::with_capacity(MAX_VERTS);
    let mut tris: Vec<[usize; 3]> = Vec::new();

    let min_extent = poly_min_extent(&verts);

    if sample_dist > 0.0 {
        for i in 0..nin {
            let j = (i + nin - 1) % nin;
            let (mut vj, mut vi) = (input[j], input[i]);

            // Sample shared edges in the same direction from both sides
            let swapped = if (vj.x - vi.x).abs() < 1e-6 {
                vj.z > vi.z
            } else {
                vj.x > vi.x
            };
            if swapped {
                std::mem::swap(&mut vj, &mut vi);
            }

            let delta = vi - vj;
            let d = (delta.x * delta.x + delta.z * delta.z).sqrt();
            let mut nn = 1 + (d / sample_dist).floor() as usize;
            nn = nn.min(MAX_VERTS_PER_EDGE - 1);
            if verts.len() + nn >= MAX_VERTS {
                nn = (MAX_VERTS - 1).saturating_sub(verts.len()).max(1);
            }

            let edge: Vec<Vec3> = (0..=nn)
                .map(|k| {
                    let u = k as f32 / nn as f32;
                    let mut pos = vj + delta * u;
                    pos.y = hp.height_at(pos, cs, ch, search_radius) as f32 * ch;
                    pos
                })
                .collect();

            // Keep the samples that deviate most from the straight edge
            let mut idx = vec![0, nn];
            let mut k = 0;
            while k + 1 < idx.len() {
                let (a, b) = (idx[k], idx[k + 1]);
                let (va, vb) = (edge[a], edge[b]);
                let mut maxd = 0.0;
                let mut maxi = None;
                for (m, &p) in edge.iter().enumerate().take(b).skip(a + 1) {
                    let dev = dist_pt_seg_sqr(p, va, vb);
                    if dev > maxd {
                        maxd = dev;
                        maxi = Some(m);
                    }
                }
                match maxi {
                    Some(m) if maxd > sample_max_error * sample_max_error => idx.insert(k + 1, m),
                    _ => k += 1,
                }
            }

            hull.push(j);
            let inner = &idx[1..idx.len() - 1];
            let ordered: Vec<usize> = if swapped {
                inner.iter().rev().copied().collect()
            } else {
                inner.to_vec()
            };
            for m in ordered {
                if verts.len() >= MAX_VERTS {
                    break;
                }
                hull.push(verts.len());
                verts.push(edge[m]);
            }
        }
    } else {
        hull.extend(0..nin);
    }

    if min_extent < sample_dist * 2.0 || sample_dist <= 0.0 {
        triangulate_hull(&verts, &hull, nin, &mut tris);
        return (verts, tris);
    }

    triangulate_hull(&verts, &hull, nin, &mut tris);
    if tris.is_empty() {
        ctx.log_warning(format!("could not triangulate polygon with {} vertices", nin));
        return (verts, tris);
    }

    let (bmin, bmax) = input
        .iter()
        .fold((input[0], input[0]), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let x0 = (bmin.x / sample_dist).floor() as i32;
    let x1 = (bmax.x / sample_dist).ceil() as i32;
    let z0 = (bmin.z / sample_dist).floor() as i32;
    let z1 = (bmax.z / sample_dist).ceil() as i32;

    // Grid samples away from the outline, as (x, height, z, used)
    let mut samples: Vec<(i32, u16, i32, bool)> = Vec::new();
    for z in z0..z1 {
        for x in x0..x1 {
            let pt = Vec3::new(x as f32 * sample_dist, (bmax.y + bmin.y) * 0.5, z as f32 * sample_dist);
            if dist_to_poly(input, pt) > -sample_dist / 2.0 {
                continue;
            }
            samples.push((x, hp.height_at(pt, cs, ch, search_radius), z, false));
        }
    }

    for _ in 0..samples.len() {
        if verts.len() >= MAX_VERTS {
            break;
        }

        let mut best: Option<(usize, Vec3, f32)> = None;
        for (i, s) in samples.iter().enumerate() {
            if s.3 {
                continue;
            }
            // Jitter to avoid degenerate triangulations on regular grids
            let pt = Vec3::new(
                s.0 as f32 * sample_dist + jitter_x(i) * cs * 0.1,
                s.1 as f32 * ch,
                s.2 as f32 * sample_dist + jitter_z(i) * cs * 0.1,
            );
            let Some(d) = dist_to_tri_mesh(pt, &verts, &tris) else {
                continue;
            };
            if best.map_or(true, |b| d > b.2) {
                best = Some((i, pt, d));
            }
        }

        let Some((i, pt, d)) = best else {
            break;
        };
        if d <= sample_max_error {
            break;
        }

        samples[i].3 = true;
        verts.push(pt);
        tris = Delaunay::triangulate(ctx, &verts, &hull);
    }

    if tris.len() > MAX_TRIS {
        ctx.log_warning(format!("shrinking detail triangles from {} to {}", tris.len(), MAX_TRIS));
        tris.truncate(MAX_TRIS);
    }

    (verts, tris)
}

/// Marks triangle edges lying on the polygon outline, two bits per edge
fn tri_edge_flags(va: Vec3, vb: Vec3, vc: Vec3, outline: &[Vec3]) -> u8 {
    const THR_SQR: f32 = 0.001 * 0.001;
    let on_outline = |a: Vec3, b: Vec3| {
        let n = outline.len();
        (0..n).any(|i| {
            let j = (i + n - 1) % n;
            dist_point_segment_sqr_2d(a, outline[j], outline[i]).0 < THR_SQR
                && dist_point_segment_sqr_2d(b, outline[j], outline[i]).0 < THR_SQR
        })
    };
    on_outline(va, vb) as u8 | (on_outline(vb, vc) as u8) << 2 | (on_outline(vc, va) as u8) << 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{BuildContoursFlags, ContourSet};
    use crate::distance_field::build_distance_field;
    use crate::heightfield::Heightfield;
    use crate::regions::build_regions;
    use crate::RC_WALKABLE_AREA;
    use approx::assert_relative_eq;

    fn build(size: i32, sample_dist: f32) -> Result<(PolyMesh, PolyMeshDetail)> {
        let cs = 0.5;
        let mut hf = Heightfield::new(
            size,
            size,
            Vec3::ZERO,
            Vec3::new(size as f32 * cs, 4.0, size as f32 * cs),
            cs,
            0.25,
        )?;
        for z in 0..size {
            for x in 0..size {
                hf.add_span(x, z, 0, 4, RC_WALKABLE_AREA, 1)?;
            }
        }
        let mut ctx = BuildContext::new();
        let mut chf = CompactHeightfield::build(&mut ctx, 4, 1, &hf)?;
        build_distance_field(&mut ctx, &mut chf)?;
        build_regions(&mut ctx, &mut chf, 0, 1, 1000)?;
        let cset = ContourSet::build(&mut ctx, &chf, 1.3, 12, BuildContoursFlags::default())?;
        let mesh = PolyMesh::build(&mut ctx, &cset, 6)?;
        let detail = PolyMeshDetail::build(&mut ctx, &mesh, &chf, sample_dist, 0.25)?;
        Ok((mesh, detail))
    }

    #[test]
    fn test_flat_detail_is_level() -> Result<()> {
        let (mesh, detail) = build(10, 3.0)?;

        assert_eq!(detail.meshes.len(), mesh.npolys);
        assert!(detail.ntris() >= mesh.npolys);
        // floor at span top (4 * 0.25) plus one cell height
        for v in &detail.verts {
            assert_relative_eq!(v.y, 1.25, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_sub_mesh_indices_in_range() -> Result<()> {
        let (mesh, detail) = build(12, 1.0)?;
        for i in 0..mesh.npolys {
            let (verts, tris) = detail.sub_mesh(i).ok_or_else(|| {
                navgeom_common::Error::NavMeshGeneration(format!("missing sub mesh {}", i))
            })?;
            for t in tris {
                assert!((t[0] as usize) < verts.len());
                assert!((t[1] as usize) < verts.len());
                assert!((t[2] as usize) < verts.len());
            }
        }
        Ok(())
    }

    #[test]
    fn test_no_sampling() -> Result<()> {
        let (mesh, detail) = build(8, 0.0)?;
        let outline_verts: usize = (0..mesh.npolys).map(|i| mesh.poly_vertex_count(i)).sum();
        assert_eq!(detail.nverts(), outline_verts);
        Ok(())
    }

    #[test]
    fn test_hull_fan() {
        let verts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 0.0),
        ];
        let mut tris = Vec::new();
        triangulate_hull(&verts, &[0, 1, 2, 3], 4, &mut tris);
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn test_outline_edge_flags() {
        let outline = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0), Vec3::new(2.0, 0.0, 0.0)];
        let flags = tri_edge_flags(outline[0], outline[1], outline[2], &outline);
        assert_eq!(flags, 0b01_01_01);
    }

    #[test]
    fn test_delaunay_square_with_center() {
        let pts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(2.1, 0.0, 1.9),
        ];
        let tris = Delaunay::triangulate(&mut BuildContext::new(), &pts, &[0, 1, 2, 3]);
        assert_eq!(tris.len(), 4);
        assert!(tris.iter().all(|t| t.contains(&4)));
    }
}
