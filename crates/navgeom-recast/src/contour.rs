//! Region contours
//!
//! Every region is outlined by walking its boundary edges. The raw outline is
//! simplified to the vertices where neighbors change plus enough extra points
//! to stay within `max_error` of the raw outline. Holes inside a region are
//! merged into its outline through a bridging edge.

use glam::Vec3;

use navgeom_common::{Error, Result};

use crate::compact_heightfield::{CompactHeightfield, RC_BORDER_REG};
use crate::context::{BuildContext, TimerCategory};
use crate::predicates::{distance_pt_seg_sqr, intersect, left, left_on, next, prev, vequal, GridVertex};

/// Vertex flag: the vertex sits on the tile border and may be removed
pub const RC_BORDER_VERTEX: i32 = 0x10000;
/// Vertex flag: the following edge separates two area types
pub const RC_AREA_BORDER: i32 = 0x20000;
/// Bits of a vertex's flags holding the neighbor region id
pub const RC_CONTOUR_REG_MASK: i32 = 0xffff;

/// Which edges get extra vertices when longer than `max_edge_len`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildContoursFlags {
    /// Edges facing unwalkable space
    pub tess_wall_edges: bool,
    /// Edges between two area types
    pub tess_area_edges: bool,
}

impl Default for BuildContoursFlags {
    fn default() -> Self {
        Self {
            tess_wall_edges: true,
            tess_area_edges: false,
        }
    }
}

/// Outline of one region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    /// Simplified vertices as `[x, y, z, flags]` in grid units
    pub verts: Vec<GridVertex>,
    /// Raw outline before simplification
    pub raw_verts: Vec<GridVertex>,
    pub reg: u16,
    pub area: u8,
}

impl Contour {
    /// Twice the signed area; positive for outlines, negative for holes
    fn signed_area2(verts: &[GridVertex]) -> i64 {
        let n = verts.len();
        let mut area = 0i64;
        for i in 0..n {
            let vi = verts[i];
            let vj = verts[prev(i, n)];
            area += vi[0] as i64 * vj[2] as i64 - vj[0] as i64 * vi[2] as i64;
        }
        (area + 1) / 2
    }

    fn is_hole(&self) -> bool {
        Self::signed_area2(&self.verts) < 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cs: f32,
    pub ch: f32,
    pub width: i32,
    pub height: i32,
    pub border_size: i32,
    pub max_error: f32,
}

/// Height of the corner clockwise from `dir` of span `i`, and whether the
/// corner only exists because of the tile border
fn corner_height(chf: &CompactHeightfield, x: i32, z: i32, i: usize, dir: usize) -> (i32, bool) {
    let dirp = (dir + 1) & 3;
    let code = |k: usize| chf.spans[k].reg as u32 | (chf.areas[k] as u32) << 16;

    let mut height = chf.spans[i].y as i32;
    let mut regs = [code(i), 0, 0, 0];

    if let Some((ax, az, ai)) = chf.neighbor(x, z, i, dir) {
        height = height.max(chf.spans[ai].y as i32);
        regs[1] = code(ai);
        if let Some((_, _, bi)) = chf.neighbor(ax, az, ai, dirp) {
            height = height.max(chf.spans[bi].y as i32);
            regs[2] = code(bi);
        }
    }
    if let Some((ax, az, ai)) = chf.neighbor(x, z, i, dirp) {
        height = height.max(chf.spans[ai].y as i32);
        regs[3] = code(ai);
        if let Some((_, _, bi)) = chf.neighbor(ax, az, ai, dir) {
            height = height.max(chf.spans[bi].y as i32);
            regs[2] = code(bi);
        }
    }

    let border = RC_BORDER_REG as u32;
    let is_border_vertex = (0..4).any(|j| {
        let (a, b, c, d) = (regs[j], regs[(j + 1) & 3], regs[(j + 2) & 3], regs[(j + 3) & 3]);
        let two_same_exteriors = a & b & border != 0 && a == b;
        let two_interiors = (c | d) & border == 0;
        let interiors_same_area = c >> 16 == d >> 16;
        let no_zeros = a != 0 && b != 0 && c != 0 && d != 0;
        two_same_exteriors && two_interiors && interiors_same_area && no_zeros
    });

    (height, is_border_vertex)
}

/// Traces the outline starting at a boundary edge of span `i`, consuming the
/// edge flags it visits
fn walk_contour(
    chf: &CompactHeightfield,
    (mut x, mut z, mut i): (i32, i32, usize),
    flags: &mut [u8],
) -> Vec<GridVertex> {
    let mut points = Vec::new();
    let Some(mut dir) = (0..4).find(|&d| flags[i] & (1 << d) != 0) else {
        return points;
    };

    let start_dir = dir;
    let start_i = i;
    let area = chf.areas[i];

    for _ in 0..40000 {
        if flags[i] & (1 << dir) != 0 {
            let (py, is_border_vertex) = corner_height(chf, x, z, i, dir);
            let (px, pz) = match dir {
                0 => (x, z + 1),
                1 => (x + 1, z + 1),
                2 => (x + 1, z),
                _ => (x, z),
            };

            let mut r = 0;
            if let Some((_, _, ai)) = chf.neighbor(x, z, i, dir) {
                r = chf.spans[ai].reg as i32;
                if chf.areas[ai] != area {
                    r |= RC_AREA_BORDER;
                }
            }
            if is_border_vertex {
                r |= RC_BORDER_VERTEX;
            }

            points.push([px, py, pz, r]);
            flags[i] &= !(1 << dir);
            dir = (dir + 1) & 3;
        } else {
            let Some((nx, nz, ni)) = chf.neighbor(x, z, i, dir) else {
                return points;
            };
            x = nx;
            z = nz;
            i = ni;
            dir = (dir + 3) & 3;
        }

        if i == start_i && dir == start_dir {
            break;
        }
    }

    points
}

/// Simplified outline as `[x, y, z, raw index]` entries; the last field is
/// replaced by the vertex flags before returning
fn simplify_contour(
    points: &[GridVertex],
    max_error: f32,
    max_edge_len: i32,
    flags: BuildContoursFlags,
) -> Vec<GridVertex> {
    let pn = points.len();
    let mut simplified: Vec<GridVertex> = Vec::new();
    if pn == 0 {
        return simplified;
    }

    let has_connections = points.iter().any(|p| p[3] & RC_CONTOUR_REG_MASK != 0);
    if has_connections {
        // Keep every vertex where the neighbor region or area changes
        for i in 0..pn {
            let ii = next(i, pn);
            let different_regs = points[i][3] & RC_CONTOUR_REG_MASK != points[ii][3] & RC_CONTOUR_REG_MASK;
            let area_borders = points[i][3] & RC_AREA_BORDER != points[ii][3] & RC_AREA_BORDER;
            if different_regs || area_borders {
                simplified.push([points[i][0], points[i][1], points[i][2], i as i32]);
            }
        }
    }

    if simplified.is_empty() {
        // Seed with the lower-left and upper-right vertices
        let mut ll = 0;
        let mut ur = 0;
        for (i, p) in points.iter().enumerate() {
            let (x, z) = (p[0], p[2]);
            if x < points[ll][0] || (x == points[ll][0] && z < points[ll][2]) {
                ll = i;
            }
            if x > points[ur][0] || (x == points[ur][0] && z > points[ur][2]) {
                ur = i;
            }
        }
        simplified.push([points[ll][0], points[ll][1], points[ll][2], ll as i32]);
        simplified.push([points[ur][0], points[ur][1], points[ur][2], ur as i32]);
    }

    // Add the farthest raw point until every segment is within tolerance
    let max_error_sqr = max_error * max_error;
    let mut i = 0;
    while i < simplified.len() {
        let ii = next(i, simplified.len());
        let (mut ax, mut az, ai) = (simplified[i][0], simplified[i][2], simplified[i][3] as usize);
        let (mut bx, mut bz, bi) = (simplified[ii][0], simplified[ii][2], simplified[ii][3] as usize);

        // Walk the segment in lexicographic order so shared edges match
        let (cinc, mut ci, endi) = if bx > ax || (bx == ax && bz > az) {
            (1, (ai + 1) % pn, bi)
        } else {
            std::mem::swap(&mut ax, &mut bx);
            std::mem::swap(&mut az, &mut bz);
            (pn - 1, (bi + pn - 1) % pn, ai)
        };

        let mut max_d = 0.0;
        let mut max_i = None;
        // Only outer edges and area borders are tessellated
        if points[ci][3] & RC_CONTOUR_REG_MASK == 0 || points[ci][3] & RC_AREA_BORDER != 0 {
            while ci != endi {
                let d = distance_pt_seg_sqr(points[ci][0], points[ci][2], (ax, az), (bx, bz));
                if d > max_d {
                    max_d = d;
                    max_i = Some(ci);
                }
                ci = (ci + cinc) % pn;
            }
        }

        match max_i {
            Some(m) if max_d > max_error_sqr => {
                simplified.insert(i + 1, [points[m][0], points[m][1], points[m][2], m as i32]);
            }
            _ => i += 1,
        }
    }

    // Split edges longer than the limit
    if max_edge_len > 0 && (flags.tess_wall_edges || flags.tess_area_edges) {
        let mut i = 0;
        while i < simplified.len() {
            let ii = next(i, simplified.len());
            let (ax, az, ai) = (simplified[i][0], simplified[i][2], simplified[i][3] as usize);
            let (bx, bz, bi) = (simplified[ii][0], simplified[ii][2], simplified[ii][3] as usize);

            let ci = (ai + 1) % pn;
            let tessellate = (flags.tess_wall_edges && points[ci][3] & RC_CONTOUR_REG_MASK == 0)
                || (flags.tess_area_edges && points[ci][3] & RC_AREA_BORDER != 0);

            let mut max_i = None;
            if tessellate {
                let dx = (bx - ax) as i64;
                let dz = (bz - az) as i64;
                let max_len = max_edge_len as i64;
                if dx * dx + dz * dz > max_len * max_len {
                    let n = if bi < ai { bi + pn - ai } else { bi - ai };
                    if n > 1 {
                        max_i = Some(if bx > ax || (bx == ax && bz > az) {
                            (ai + n / 2) % pn
                        } else {
                            (ai + (n + 1) / 2) % pn
                        });
                    }
                }
            }

            match max_i {
                Some(m) => simplified.insert(i + 1, [points[m][0], points[m][1], points[m][2], m as i32]),
                None => i += 1,
            }
        }
    }

    for v in simplified.iter_mut() {
        // The edge flags come from the raw segment after the vertex, the
        // border flag from the vertex itself
        let bi = v[3] as usize;
        let ai = (bi + 1) % pn;
        v[3] = (points[ai][3] & (RC_CONTOUR_REG_MASK | RC_AREA_BORDER)) | (points[bi][3] & RC_BORDER_VERTEX);
    }

    simplified
}

/// Drops vertices that coincide with their successor on the grid plane
fn remove_degenerate_segments(simplified: &mut Vec<GridVertex>) {
    let mut i = 0;
    while i < simplified.len() {
        let ni = next(i, simplified.len());
        if simplified.len() > 1 && vequal(&simplified[i], &simplified[ni]) {
            simplified.remove(i);
        }
        i += 1;
    }
}

fn in_cone(i: usize, verts: &[GridVertex], pj: &GridVertex) -> bool {
    let n = verts.len();
    let pi = &verts[i];
    let pi1 = &verts[next(i, n)];
    let pin1 = &verts[prev(i, n)];

    // Convex corner
    if left_on(pin1, pi, pi1) {
        return left(pi, pj, pin1) && left(pj, pi, pi1);
    }
    !(left_on(pi, pj, pi1) && left_on(pj, pi, pin1))
}

/// Whether segment `d0..d1` crosses any edge of `verts` that does not touch
/// it or vertex `skip`
fn intersect_seg_contour(d0: &GridVertex, d1: &GridVertex, skip: Option<usize>, verts: &[GridVertex]) -> bool {
    let n = verts.len();
    (0..n).any(|k| {
        let k1 = next(k, n);
        if skip == Some(k) || skip == Some(k1) {
            return false;
        }
        let (p0, p1) = (&verts[k], &verts[k1]);
        if vequal(d0, p0) || vequal(d1, p0) || vequal(d0, p1) || vequal(d1, p1) {
            return false;
        }
        intersect(d0, d1, p0, p1)
    })
}

/// Index and position of the lowest x, then lowest z, vertex
fn leftmost_vertex(verts: &[GridVertex]) -> (usize, i32, i32) {
    let mut best = (0, verts[0][0], verts[0][2]);
    for (i, v) in verts.iter().enumerate().skip(1) {
        if v[0] < best.1 || (v[0] == best.1 && v[2] < best.2) {
            best = (i, v[0], v[2]);
        }
    }
    best
}

/// Splices `hole` into `outline` through the edge `outline[ia]..hole[ib]`
fn merge_contours(outline: &mut Vec<GridVertex>, hole: &[GridVertex], ia: usize, ib: usize) {
    let na = outline.len();
    let nb = hole.len();
    let mut verts = Vec::with_capacity(na + nb + 2);
    verts.extend((0..=na).map(|k| outline[(ia + k) % na]));
    verts.extend((0..=nb).map(|k| hole[(ib + k) % nb]));
    *outline = verts;
}

/// Merges every hole of one region into its outline, leftmost hole first
fn merge_region_holes(ctx: &mut BuildContext, contours: &mut [Contour], outline: usize, mut holes: Vec<usize>) {
    let mut keyed: Vec<(usize, usize, i32, i32)> = holes
        .drain(..)
        .map(|h| {
            let (leftmost, minx, minz) = leftmost_vertex(&contours[h].verts);
            (h, leftmost, minx, minz)
        })
        .collect();
    keyed.sort_by_key(|&(_, _, minx, minz)| (minx, minz));

    for i in 0..keyed.len() {
        let (hole_idx, leftmost, _, _) = keyed[i];
        let hole = contours[hole_idx].verts.clone();
        let mut best_vertex = leftmost;
        let mut merge_at = None;

        for _ in 0..hole.len() {
            let corner = hole[best_vertex];
            let outline_verts = &contours[outline].verts;

            // Outline vertices that can see the hole corner, nearest first
            let mut diagonals: Vec<(usize, i64)> = (0..outline_verts.len())
                .filter(|&j| in_cone(j, outline_verts, &corner))
                .map(|j| {
                    let dx = (outline_verts[j][0] - corner[0]) as i64;
                    let dz = (outline_verts[j][2] - corner[2]) as i64;
                    (j, dx * dx + dz * dz)
                })
                .collect();
            diagonals.sort_by_key(|&(_, d)| d);

            merge_at = diagonals.iter().map(|&(j, _)| j).find(|&j| {
                let pt = &outline_verts[j];
                !intersect_seg_contour(pt, &corner, Some(j), outline_verts)
                    && keyed[i..]
                        .iter()
                        .all(|&(h, ..)| !intersect_seg_contour(pt, &corner, None, &contours[h].verts))
            });
            if merge_at.is_some() {
                break;
            }
            best_vertex = (best_vertex + 1) % hole.len();
        }

        match merge_at {
            Some(index) => {
                merge_contours(&mut contours[outline].verts, &hole, index, best_vertex);
                contours[hole_idx].verts.clear();
            }
            None => ctx.log_warning(format!(
                "region {}: no bridge found for hole with {} vertices",
                contours[outline].reg,
                hole.len()
            )),
        }
    }
}

impl ContourSet {
    /// Traces and simplifies the outline of every region in `chf`.
    ///
    /// Requires regions to be built. `max_error` is in cells, `max_edge_len`
    /// in cells with 0 disabling edge splitting.
    pub fn build(
        ctx: &mut BuildContext,
        chf: &CompactHeightfield,
        max_error: f32,
        max_edge_len: i32,
        flags: BuildContoursFlags,
    ) -> Result<Self> {
        ctx.timed(TimerCategory::Contours, |ctx| -> Result<Self> {
            let border_size = chf.border_size;
            let pad = border_size as f32 * chf.cs;

            let mut cset = ContourSet {
                contours: Vec::new(),
                bmin: chf.bmin + Vec3::new(pad, 0.0, pad),
                bmax: chf.bmax - Vec3::new(pad, 0.0, pad),
                cs: chf.cs,
                ch: chf.ch,
                width: chf.width - border_size * 2,
                height: chf.height - border_size * 2,
                border_size,
                max_error,
            };

            // Bit per direction set when the edge borders another region
            let mut edge_flags = vec![0u8; chf.span_count];
            for (x, z, i) in chf.iter_spans() {
                let reg = chf.spans[i].reg;
                if reg == 0 || reg & RC_BORDER_REG != 0 {
                    continue;
                }
                let mut connected = 0u8;
                for dir in 0..4 {
                    let r = chf.neighbor(x, z, i, dir).map_or(0, |(_, _, ai)| chf.spans[ai].reg);
                    if r == reg {
                        connected |= 1 << dir;
                    }
                }
                edge_flags[i] = connected ^ 0xf;
            }

            for (x, z, i) in chf.iter_spans() {
                if edge_flags[i] == 0 || edge_flags[i] == 0xf {
                    edge_flags[i] = 0;
                    continue;
                }
                let reg = chf.spans[i].reg;
                if reg == 0 || reg & RC_BORDER_REG != 0 {
                    continue;
                }

                let raw = walk_contour(chf, (x, z, i), &mut edge_flags);
                let mut simplified = simplify_contour(&raw, max_error, max_edge_len, flags);
                remove_degenerate_segments(&mut simplified);

                if simplified.len() >= 3 {
                    let unpad = |mut v: GridVertex| {
                        v[0] -= border_size;
                        v[2] -= border_size;
                        v
                    };
                    cset.contours.push(Contour {
                        verts: simplified.into_iter().map(unpad).collect(),
                        raw_verts: raw.into_iter().map(unpad).collect(),
                        reg,
                        area: chf.areas[i],
                    });
                }
            }

            cset.merge_holes(ctx, chf.max_regions)?;

            ctx.log_debug(format!("built {} contours", cset.contours.len()));
            Ok(cset)
        })
    }

    fn merge_holes(&mut self, ctx: &mut BuildContext, max_regions: u16) -> Result<()> {
        let nregions = max_regions as usize + 1;
        let mut outlines: Vec<Option<usize>> = vec![None; nregions];
        let mut holes: Vec<Vec<usize>> = vec![Vec::new(); nregions];

        for (i, contour) in self.contours.iter().enumerate() {
            let reg = contour.reg as usize;
            if reg >= nregions {
                continue;
            }
            if contour.is_hole() {
                holes[reg].push(i);
            } else if outlines[reg].replace(i).is_some() {
                return Err(Error::NavMeshGeneration(format!(
                    "region {} has multiple outlines",
                    reg
                )));
            }
        }

        for (reg, region_holes) in holes.into_iter().enumerate() {
            if region_holes.is_empty() {
                continue;
            }
            match outlines[reg] {
                Some(outline) => merge_region_holes(ctx, &mut self.contours, outline, region_holes),
                None => ctx.log_warning(format!("region {} has holes but no outline", reg)),
            }
        }

        self.contours.retain(|c| c.verts.len() >= 3);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance_field::build_distance_field;
    use crate::heightfield::Heightfield;
    use crate::regions::build_regions;
    use crate::RC_WALKABLE_AREA;

    fn regions_for(width: i32, depth: i32, hole: impl Fn(i32, i32) -> bool) -> Result<CompactHeightfield> {
        let mut hf = Heightfield::new(width, depth, Vec3::ZERO, Vec3::new(width as f32, 5.0, depth as f32), 1.0, 0.5)?;
        for z in 0..depth {
            for x in 0..width {
                if !hole(x, z) {
                    hf.add_span(x, z, 0, 2, RC_WALKABLE_AREA, 1)?;
                }
            }
        }
        let mut ctx = BuildContext::new();
        let mut chf = CompactHeightfield::build(&mut ctx, 4, 1, &hf)?;
        build_distance_field(&mut ctx, &mut chf)?;
        build_regions(&mut ctx, &mut chf, 0, 1, 1000)?;
        Ok(chf)
    }

    #[test]
    fn test_square_contour() -> Result<()> {
        let chf = regions_for(6, 6, |_, _| false)?;
        let mut ctx = BuildContext::new();
        let cset = ContourSet::build(&mut ctx, &chf, 1.3, 0, BuildContoursFlags::default())?;

        assert_eq!(cset.contours.len(), 1);
        let contour = &cset.contours[0];
        let mut corners: Vec<(i32, i32)> = contour.verts.iter().map(|v| (v[0], v[2])).collect();
        corners.sort();
        assert_eq!(corners, vec![(0, 0), (0, 6), (6, 0), (6, 6)]);
        assert_eq!(contour.raw_verts.len(), 24);
        assert_eq!(contour.area, RC_WALKABLE_AREA);
        assert_eq!(ctx.timer_count(TimerCategory::Contours), 1);
        Ok(())
    }

    #[test]
    fn test_long_edges_are_split() -> Result<()> {
        let chf = regions_for(12, 2, |_, _| false)?;
        let cset = ContourSet::build(&mut BuildContext::new(), &chf, 1.3, 4, BuildContoursFlags::default())?;

        for contour in &cset.contours {
            let n = contour.verts.len();
            for i in 0..n {
                let a = contour.verts[i];
                let b = contour.verts[next(i, n)];
                let (dx, dz) = (b[0] - a[0], b[2] - a[2]);
                assert!(dx * dx + dz * dz <= 16, "edge {:?} -> {:?}", a, b);
            }
        }
        Ok(())
    }

    #[test]
    fn test_hole_is_merged() -> Result<()> {
        // ring of walkable cells around a 2x2 gap
        let chf = regions_for(8, 8, |x, z| (3..5).contains(&x) && (3..5).contains(&z))?;
        let cset = ContourSet::build(&mut BuildContext::new(), &chf, 1.3, 0, BuildContoursFlags::default())?;

        assert!(cset.contours.iter().all(|c| !c.is_hole()));
        let total: usize = cset.contours.iter().map(|c| c.verts.len()).sum();
        // outer square, inner square and the bridge duplicates
        assert!(total >= 8);
        Ok(())
    }

    #[test]
    fn test_simplify_keeps_region_changes() {
        let raw: Vec<GridVertex> = vec![
            [0, 0, 0, 0],
            [0, 0, 1, 0],
            [0, 0, 2, 3],
            [1, 0, 2, 3],
            [2, 0, 2, 0],
            [2, 0, 1, 0],
            [2, 0, 0, 0],
            [1, 0, 0, 0],
        ];
        let simplified = simplify_contour(&raw, 0.5, 0, BuildContoursFlags::default());
        assert!(simplified.iter().any(|v| v[3] & RC_CONTOUR_REG_MASK == 3));
        assert!(simplified.len() >= 3);
    }

    #[test]
    fn test_degenerate_segments() {
        let mut verts = vec![[0, 0, 0, 0], [0, 1, 0, 0], [2, 0, 0, 0], [2, 0, 2, 0]];
        remove_degenerate_segments(&mut verts);
        assert_eq!(verts.len(), 3);
    }
}
