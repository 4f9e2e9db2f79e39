//! Region partitioning of the compact heightfield
//!
//! Two partitions are available. Watershed grows regions from the distance
//! field maxima and gives the best shaped regions. Monotone sweeps rows and is
//! faster but produces long thin regions. Both finish with the same filtering
//! step, which removes small islands, merges small regions into neighbors and
//! compacts the ids.

use navgeom_common::{Error, Result};

use crate::compact_heightfield::{CompactHeightfield, RC_BORDER_REG};
use crate::context::{BuildContext, TimerCategory};
use crate::RC_NULL_AREA;

/// Number of level stacks the watershed cycles through
const NB_STACKS: usize = 8;

/// Iterations of region growth per watershed level
const EXPAND_ITERS: usize = 8;

/// Marks a sweep that touches more than one region in the previous row
const NULL_NEIGHBOR: u16 = 0xffff;

/// Strategy used to split the walkable area into regions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum RegionPartition {
    #[default]
    Watershed,
    Monotone,
}

type LevelStack = Vec<(i32, i32, usize)>;

#[derive(Debug, Clone)]
struct Region {
    span_count: usize,
    id: u16,
    area_type: u8,
    remap: bool,
    visited: bool,
    /// Region has spans stacked above each other in one cell
    overlap: bool,
    /// Neighbor ids in contour order, 0 for unwalkable space
    connections: Vec<u16>,
    /// Regions found above or below this one
    floors: Vec<u16>,
}

impl Region {
    fn new(id: u16) -> Self {
        Self {
            span_count: 0,
            id,
            area_type: 0,
            remap: false,
            visited: false,
            overlap: false,
            connections: Vec::new(),
            floors: Vec::new(),
        }
    }

    fn add_unique_floor(&mut self, id: u16) {
        if !self.floors.contains(&id) {
            self.floors.push(id);
        }
    }

    fn remove_adjacent_neighbors(&mut self) {
        let mut i = 0;
        while i < self.connections.len() && self.connections.len() > 1 {
            let ni = (i + 1) % self.connections.len();
            if self.connections[i] == self.connections[ni] {
                self.connections.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn replace_neighbor(&mut self, old_id: u16, new_id: u16) {
        let mut changed = false;
        for c in self.connections.iter_mut().filter(|c| **c == old_id) {
            *c = new_id;
            changed = true;
        }
        for f in self.floors.iter_mut().filter(|f| **f == old_id) {
            *f = new_id;
        }
        if changed {
            self.remove_adjacent_neighbors();
        }
    }

    fn can_merge_with(&self, other: &Region) -> bool {
        if self.area_type != other.area_type {
            return false;
        }
        let shared_edges = self.connections.iter().filter(|&&c| c == other.id).count();
        shared_edges <= 1 && !self.floors.contains(&other.id)
    }

    fn is_connected_to_border(&self) -> bool {
        self.connections.contains(&0)
    }
}

/// Writes `id` into every walkable span of the cell rectangle
fn paint_rect_region(
    chf: &CompactHeightfield,
    (min_x, max_x): (i32, i32),
    (min_z, max_z): (i32, i32),
    id: u16,
    src_reg: &mut [u16],
) {
    for z in min_z..max_z {
        for x in min_x..max_x {
            for i in chf.cell(x, z).spans() {
                if chf.areas[i] != RC_NULL_AREA {
                    src_reg[i] = id;
                }
            }
        }
    }
}

/// Paints the four border strips with their own flagged ids and returns the
/// next free id
fn paint_border(chf: &CompactHeightfield, border_size: i32, src_reg: &mut [u16]) -> u16 {
    if border_size <= 0 {
        return 1;
    }
    let w = chf.width;
    let h = chf.height;
    let bw = w.min(border_size);
    let bh = h.min(border_size);

    paint_rect_region(chf, (0, bw), (0, h), 1 | RC_BORDER_REG, src_reg);
    paint_rect_region(chf, (w - bw, w), (0, h), 2 | RC_BORDER_REG, src_reg);
    paint_rect_region(chf, (0, w), (0, bh), 3 | RC_BORDER_REG, src_reg);
    paint_rect_region(chf, (0, w), (h - bh, h), 4 | RC_BORDER_REG, src_reg);
    5
}

fn sort_cells_by_level(
    start_level: u16,
    chf: &CompactHeightfield,
    src_reg: &[u16],
    stacks: &mut [LevelStack],
) {
    let start_level = (start_level >> 1) as i32;
    for stack in stacks.iter_mut() {
        stack.clear();
    }

    for (x, z, i) in chf.iter_spans() {
        if chf.areas[i] == RC_NULL_AREA || src_reg[i] != 0 {
            continue;
        }
        let level = (chf.dist[i] >> 1) as i32;
        let stack_id = (start_level - level).max(0) as usize;
        if stack_id < stacks.len() {
            stacks[stack_id].push((x, z, i));
        }
    }
}

fn append_stacks(stacks: &mut [LevelStack], src: usize, dst: usize, src_reg: &[u16]) {
    let pending: Vec<_> = stacks[src]
        .iter()
        .copied()
        .filter(|&(_, _, i)| src_reg[i] == 0)
        .collect();
    stacks[dst].extend(pending);
}

/// Grows existing regions into unassigned spans at or above `level`.
///
/// With `fill_stack` the stack is rebuilt from every such span; otherwise the
/// given level stack is used. Growth stops after `max_iter` rounds unless
/// `level` is zero.
#[allow(clippy::too_many_arguments)]
fn expand_regions(
    max_iter: usize,
    level: u16,
    chf: &CompactHeightfield,
    src_reg: &mut [u16],
    src_dist: &mut [u16],
    stack: &mut LevelStack,
    fill_stack: bool,
) {
    if fill_stack {
        stack.clear();
        for (x, z, i) in chf.iter_spans() {
            if chf.dist[i] >= level && src_reg[i] == 0 && chf.areas[i] != RC_NULL_AREA {
                stack.push((x, z, i));
            }
        }
    }

    let mut dirty = Vec::new();
    let mut iter = 0;
    while !stack.is_empty() {
        let mut failed = 0;
        dirty.clear();

        for &(x, z, i) in stack.iter() {
            if src_reg[i] != 0 {
                failed += 1;
                continue;
            }

            let area = chf.areas[i];
            let mut best: Option<(u16, u16)> = None;
            for dir in 0..4 {
                let Some((_, _, ai)) = chf.neighbor(x, z, i, dir) else {
                    continue;
                };
                if chf.areas[ai] != area {
                    continue;
                }
                let reg = src_reg[ai];
                if reg > 0 && reg & RC_BORDER_REG == 0 {
                    let d = src_dist[ai].saturating_add(2);
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((reg, d));
                    }
                }
            }

            match best {
                Some((reg, d)) => dirty.push((i, reg, d)),
                None => failed += 1,
            }
        }

        for &(i, reg, d) in &dirty {
            src_reg[i] = reg;
            src_dist[i] = d;
        }

        if failed == stack.len() {
            break;
        }
        if level > 0 {
            iter += 1;
            if iter >= max_iter {
                break;
            }
        }
    }
}

/// Floods a new region `r` from span `i` over spans at least `level - 2`
/// from the boundary. Returns whether any span was claimed.
#[allow(clippy::too_many_arguments)]
fn flood_region(
    seed: (i32, i32, usize),
    level: u16,
    r: u16,
    chf: &CompactHeightfield,
    src_reg: &mut [u16],
    src_dist: &mut [u16],
    stack: &mut LevelStack,
) -> bool {
    let area = chf.areas[seed.2];

    stack.clear();
    stack.push(seed);
    src_reg[seed.2] = r;
    src_dist[seed.2] = 0;

    let lev = level.saturating_sub(2);
    let mut count = 0;

    while let Some((cx, cz, ci)) = stack.pop() {
        // Stop at spans touching another region, including diagonally
        let mut touches_other = false;
        for dir in 0..4 {
            let Some((ax, az, ai)) = chf.neighbor(cx, cz, ci, dir) else {
                continue;
            };
            if chf.areas[ai] != area {
                continue;
            }
            let nr = src_reg[ai];
            if nr & RC_BORDER_REG != 0 {
                continue;
            }
            if nr != 0 && nr != r {
                touches_other = true;
                break;
            }

            if let Some((_, _, bi)) = chf.neighbor(ax, az, ai, (dir + 1) & 3) {
                if chf.areas[bi] != area {
                    continue;
                }
                let nr2 = src_reg[bi];
                if nr2 != 0 && nr2 != r {
                    touches_other = true;
                    break;
                }
            }
        }

        if touches_other {
            src_reg[ci] = 0;
            continue;
        }
        count += 1;

        for dir in 0..4 {
            let Some((ax, az, ai)) = chf.neighbor(cx, cz, ci, dir) else {
                continue;
            };
            if chf.areas[ai] == area && chf.dist[ai] >= lev && src_reg[ai] == 0 {
                src_reg[ai] = r;
                src_dist[ai] = 0;
                stack.push((ax, az, ai));
            }
        }
    }

    count > 0
}

fn next_region_id(id: u16) -> Result<u16> {
    if id == 0xffff {
        return Err(Error::NavMeshGeneration("region id overflow".to_string()));
    }
    Ok(id + 1)
}

fn is_solid_edge(chf: &CompactHeightfield, src_reg: &[u16], x: i32, z: i32, i: usize, dir: usize) -> bool {
    let r = chf.neighbor(x, z, i, dir).map_or(0, |(_, _, ai)| src_reg[ai]);
    r != src_reg[i]
}

/// Walks the outline of the region owning span `i` and records the
/// neighboring region ids in order
fn walk_contour(
    chf: &CompactHeightfield,
    src_reg: &[u16],
    (mut x, mut z, mut i): (i32, i32, usize),
    mut dir: usize,
) -> Vec<u16> {
    let start_dir = dir;
    let start_i = i;

    let mut cur_reg = chf.neighbor(x, z, i, dir).map_or(0, |(_, _, ai)| src_reg[ai]);
    let mut cont = vec![cur_reg];

    for _ in 0..40000 {
        if is_solid_edge(chf, src_reg, x, z, i, dir) {
            let r = chf.neighbor(x, z, i, dir).map_or(0, |(_, _, ai)| src_reg[ai]);
            if r != cur_reg {
                cur_reg = r;
                cont.push(cur_reg);
            }
            dir = (dir + 1) & 3;
        } else {
            let Some((nx, nz, ni)) = chf.neighbor(x, z, i, dir) else {
                return cont;
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

    let mut j = 0;
    while cont.len() > 1 && j < cont.len() {
        let nj = (j + 1) % cont.len();
        if cont[j] == cont[nj] {
            cont.remove(j);
        } else {
            j += 1;
        }
    }
    cont
}

/// Merges region `b` into region `a` along their shared edge
fn merge_regions(regions: &mut [Region], a: usize, b: usize) -> bool {
    let aid = regions[a].id;
    let bid = regions[b].id;
    let acon = regions[a].connections.clone();
    let bcon = regions[b].connections.clone();

    let Some(ins_a) = acon.iter().position(|&c| c == bid) else {
        return false;
    };
    let Some(ins_b) = bcon.iter().position(|&c| c == aid) else {
        return false;
    };

    let mut merged = Vec::with_capacity(acon.len() + bcon.len());
    merged.extend((0..acon.len() - 1).map(|k| acon[(ins_a + 1 + k) % acon.len()]));
    merged.extend((0..bcon.len() - 1).map(|k| bcon[(ins_b + 1 + k) % bcon.len()]));

    let b_floors = std::mem::take(&mut regions[b].floors);
    let b_spans = regions[b].span_count;
    regions[b].span_count = 0;
    regions[b].connections.clear();

    let target = &mut regions[a];
    target.connections = merged;
    target.remove_adjacent_neighbors();
    for floor in b_floors {
        target.add_unique_floor(floor);
    }
    target.span_count += b_spans;
    true
}

/// Removes islands smaller than `min_region_area`, merges regions smaller
/// than `merge_region_size` into neighbors and compacts the ids.
///
/// Returns the largest id in use and the ids of overlapping regions.
fn merge_and_filter_regions(
    min_region_area: usize,
    merge_region_size: usize,
    max_region_id: u16,
    chf: &CompactHeightfield,
    src_reg: &mut [u16],
) -> (u16, Vec<u16>) {
    let nreg = max_region_id as usize + 1;
    let mut regions: Vec<Region> = (0..nreg).map(|i| Region::new(i as u16)).collect();

    for (x, z, i) in chf.iter_spans() {
        let r = src_reg[i] as usize;
        if r == 0 || r >= nreg {
            continue;
        }

        regions[r].span_count += 1;

        for j in chf.cell(x, z).spans() {
            if i == j {
                continue;
            }
            let floor = src_reg[j];
            if floor == 0 || floor as usize >= nreg {
                continue;
            }
            if floor as usize == r {
                regions[r].overlap = true;
            }
            regions[r].add_unique_floor(floor);
        }

        if !regions[r].connections.is_empty() {
            continue;
        }
        regions[r].area_type = chf.areas[i];

        if let Some(dir) = (0..4).find(|&dir| is_solid_edge(chf, src_reg, x, z, i, dir)) {
            regions[r].connections = walk_contour(chf, src_reg, (x, z, i), dir);
        }
    }

    // Remove islands too small to be useful
    let mut stack = Vec::new();
    let mut trace = Vec::new();
    for i in 0..nreg {
        let reg = &regions[i];
        if reg.id == 0 || reg.id & RC_BORDER_REG != 0 || reg.span_count == 0 || reg.visited {
            continue;
        }

        let mut connects_to_border = false;
        let mut span_count = 0;
        stack.clear();
        trace.clear();

        regions[i].visited = true;
        stack.push(i);

        while let Some(ri) = stack.pop() {
            span_count += regions[ri].span_count;
            trace.push(ri);

            for k in 0..regions[ri].connections.len() {
                let c = regions[ri].connections[k];
                if c & RC_BORDER_REG != 0 {
                    connects_to_border = true;
                    continue;
                }
                let nei = &mut regions[c as usize];
                if nei.visited || nei.id == 0 || nei.id & RC_BORDER_REG != 0 {
                    continue;
                }
                nei.visited = true;
                stack.push(nei.id as usize);
            }
        }

        if span_count < min_region_area && !connects_to_border {
            for &t in &trace {
                regions[t].span_count = 0;
                regions[t].id = 0;
            }
        }
    }

    // Merge small regions into their smallest compatible neighbor
    loop {
        let mut merge_count = 0;
        for i in 0..nreg {
            let reg = &regions[i];
            if reg.id == 0 || reg.id & RC_BORDER_REG != 0 || reg.overlap || reg.span_count == 0 {
                continue;
            }
            if reg.span_count > merge_region_size && reg.is_connected_to_border() {
                continue;
            }

            let mut smallest = usize::MAX;
            let mut merge_id = reg.id;
            for &c in &reg.connections {
                if c & RC_BORDER_REG != 0 {
                    continue;
                }
                let other = &regions[c as usize];
                if other.id == 0 || other.id & RC_BORDER_REG != 0 || other.overlap {
                    continue;
                }
                if other.span_count < smallest && reg.can_merge_with(other) && other.can_merge_with(reg) {
                    smallest = other.span_count;
                    merge_id = other.id;
                }
            }

            if merge_id == reg.id {
                continue;
            }
            let old_id = reg.id;
            if merge_regions(&mut regions, merge_id as usize, i) {
                for region in regions.iter_mut() {
                    if region.id == 0 || region.id & RC_BORDER_REG != 0 {
                        continue;
                    }
                    if region.id == old_id {
                        region.id = merge_id;
                    }
                    region.replace_neighbor(old_id, merge_id);
                }
                merge_count += 1;
            }
        }
        if merge_count == 0 {
            break;
        }
    }

    // Compress region ids
    for region in regions.iter_mut() {
        region.remap = region.id != 0 && region.id & RC_BORDER_REG == 0;
    }
    let mut next_id = 0u16;
    for i in 0..nreg {
        if !regions[i].remap {
            continue;
        }
        let old_id = regions[i].id;
        next_id += 1;
        for region in regions[i..].iter_mut().filter(|r| r.id == old_id) {
            region.id = next_id;
            region.remap = false;
        }
    }

    for reg in src_reg.iter_mut() {
        if *reg & RC_BORDER_REG == 0 {
            *reg = regions[*reg as usize].id;
        }
    }

    let overlaps = regions.iter().filter(|r| r.overlap).map(|r| r.id).collect();
    (next_id, overlaps)
}

fn finish_regions(
    ctx: &mut BuildContext,
    chf: &mut CompactHeightfield,
    mut src_reg: Vec<u16>,
    region_id: u16,
    min_region_area: i32,
    merge_region_area: i32,
) {
    let (max_regions, overlaps) = merge_and_filter_regions(
        min_region_area.max(0) as usize,
        merge_region_area.max(0) as usize,
        region_id,
        chf,
        &mut src_reg,
    );
    if !overlaps.is_empty() {
        ctx.log_warning(format!("{} regions overlap themselves", overlaps.len()));
    }

    chf.max_regions = max_regions;
    for (span, reg) in chf.spans.iter_mut().zip(src_reg) {
        span.reg = reg;
    }
    ctx.log_debug(format!("partitioned into {} regions", max_regions));
}

/// Partitions the walkable area with a watershed over the distance field.
///
/// Requires `build_distance_field` to have run.
pub fn build_regions(
    ctx: &mut BuildContext,
    chf: &mut CompactHeightfield,
    border_size: i32,
    min_region_area: i32,
    merge_region_area: i32,
) -> Result<()> {
    if chf.dist.len() != chf.span_count {
        return Err(Error::NavMeshGeneration(
            "distance field must be built before regions".to_string(),
        ));
    }

    ctx.timed(TimerCategory::Regions, |ctx| -> Result<()> {
        let mut src_reg = vec![0u16; chf.span_count];
        let mut src_dist = vec![0u16; chf.span_count];
        let mut stacks: Vec<LevelStack> = vec![Vec::new(); NB_STACKS];
        let mut flood_stack = LevelStack::new();

        let mut region_id = paint_border(chf, border_size, &mut src_reg);
        chf.border_size = border_size.max(0);

        let mut level = (chf.max_distance + 1) & !1;
        let mut stack_id = NB_STACKS - 1;

        while level > 0 {
            level = level.saturating_sub(2);
            stack_id = (stack_id + 1) % NB_STACKS;

            if stack_id == 0 {
                sort_cells_by_level(level, chf, &src_reg, &mut stacks);
            } else {
                append_stacks(&mut stacks, stack_id - 1, stack_id, &src_reg);
            }

            expand_regions(
                EXPAND_ITERS,
                level,
                chf,
                &mut src_reg,
                &mut src_dist,
                &mut stacks[stack_id],
                false,
            );

            for k in 0..stacks[stack_id].len() {
                let seed = stacks[stack_id][k];
                if src_reg[seed.2] != 0 {
                    continue;
                }
                if flood_region(seed, level, region_id, chf, &mut src_reg, &mut src_dist, &mut flood_stack) {
                    region_id = next_region_id(region_id)?;
                }
            }
        }

        expand_regions(
            EXPAND_ITERS * 8,
            0,
            chf,
            &mut src_reg,
            &mut src_dist,
            &mut flood_stack,
            true,
        );

        finish_regions(ctx, chf, src_reg, region_id, min_region_area, merge_region_area);
        Ok(())
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct SweepSpan {
    /// Final region id
    id: u16,
    /// Samples connected to `nei`
    ns: u16,
    /// Neighbor region in the previous row
    nei: u16,
}

/// Partitions the walkable area into monotone regions with a row sweep
pub fn build_regions_monotone(
    ctx: &mut BuildContext,
    chf: &mut CompactHeightfield,
    border_size: i32,
    min_region_area: i32,
    merge_region_area: i32,
) -> Result<()> {
    ctx.timed(TimerCategory::Regions, |ctx| -> Result<()> {
        let w = chf.width;
        let h = chf.height;
        let mut src_reg = vec![0u16; chf.span_count];
        let mut sweeps: Vec<SweepSpan> = Vec::new();
        let mut prev: Vec<u16> = Vec::new();

        let mut id = paint_border(chf, border_size, &mut src_reg);
        chf.border_size = border_size.max(0);
        let bs = chf.border_size;

        for z in bs..h - bs {
            prev.clear();
            prev.resize(id as usize + 1, 0);
            sweeps.clear();
            sweeps.push(SweepSpan::default());
            let mut rid: u16 = 1;

            for x in bs..w - bs {
                for i in chf.cell(x, z).spans() {
                    if chf.areas[i] == RC_NULL_AREA {
                        continue;
                    }

                    let mut previd = 0;
                    if let Some((_, _, ai)) = chf.neighbor(x, z, i, 0) {
                        if src_reg[ai] & RC_BORDER_REG == 0 && chf.areas[i] == chf.areas[ai] {
                            previd = src_reg[ai];
                        }
                    }
                    if previd == 0 {
                        previd = rid;
                        rid = next_region_id(rid)?;
                        sweeps.push(SweepSpan::default());
                    }

                    if let Some((_, _, ai)) = chf.neighbor(x, z, i, 3) {
                        let nr = src_reg[ai];
                        if nr != 0 && nr & RC_BORDER_REG == 0 && chf.areas[i] == chf.areas[ai] {
                            let sweep = &mut sweeps[previd as usize];
                            if sweep.nei == 0 || sweep.nei == nr {
                                sweep.nei = nr;
                                sweep.ns += 1;
                                if let Some(count) = prev.get_mut(nr as usize) {
                                    *count += 1;
                                }
                            } else {
                                sweep.nei = NULL_NEIGHBOR;
                            }
                        }
                    }

                    src_reg[i] = previd;
                }
            }

            // Continue a region from the previous row only when the row
            // segment is its sole connection
            for sweep in sweeps.iter_mut().skip(1) {
                let nei = sweep.nei;
                if nei != NULL_NEIGHBOR && nei != 0 && prev.get(nei as usize) == Some(&sweep.ns) {
                    sweep.id = nei;
                } else {
                    sweep.id = id;
                    id = next_region_id(id)?;
                }
            }

            for x in bs..w - bs {
                for i in chf.cell(x, z).spans() {
                    let r = src_reg[i];
                    if r > 0 && r < rid {
                        src_reg[i] = sweeps[r as usize].id;
                    }
                }
            }
        }

        finish_regions(ctx, chf, src_reg, id, min_region_area, merge_region_area);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance_field::build_distance_field;
    use crate::heightfield::Heightfield;
    use crate::RC_WALKABLE_AREA;
    use glam::Vec3;
    use std::collections::HashSet;

    /// Flat field with the cells marked by `hole` left out
    fn field(width: i32, depth: i32, hole: impl Fn(i32, i32) -> bool) -> Result<CompactHeightfield> {
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
        Ok(chf)
    }

    fn region_ids(chf: &CompactHeightfield) -> HashSet<u16> {
        chf.spans.iter().map(|s| s.reg).collect()
    }

    #[test]
    fn test_watershed_single_region() -> Result<()> {
        let mut chf = field(10, 10, |_, _| false)?;
        let mut ctx = BuildContext::new();
        build_regions(&mut ctx, &mut chf, 0, 8, 20)?;

        let ids = region_ids(&chf);
        assert!(!ids.contains(&0));
        assert_eq!(ids.len(), chf.max_regions as usize);
        assert_eq!(ctx.timer_count(TimerCategory::Regions), 1);
        Ok(())
    }

    #[test]
    fn test_separate_islands() -> Result<()> {
        // two 6x6 blocks split by an empty column
        let mut chf = field(13, 6, |x, _| x == 6)?;
        build_regions(&mut BuildContext::new(), &mut chf, 0, 4, 0)?;

        let left = chf.spans[chf.cell(0, 0).index as usize].reg;
        let right = chf.spans[chf.cell(12, 0).index as usize].reg;
        assert_ne!(left, right);
        assert!(left != 0 && right != 0);
        Ok(())
    }

    #[test]
    fn test_small_island_removed() -> Result<()> {
        // 8x8 block plus a 2x2 island in the far corner
        let mut chf = field(12, 12, |x, z| {
            let in_block = x < 8 && z < 8;
            let in_island = x >= 10 && z >= 10;
            !(in_block || in_island)
        })?;
        build_regions(&mut BuildContext::new(), &mut chf, 0, 8, 20)?;

        assert!(chf.max_regions >= 1);
        assert_ne!(chf.spans[chf.cell(3, 3).index as usize].reg, 0);
        let island = chf.spans[chf.cell(11, 11).index as usize].reg;
        assert_eq!(island, 0);
        Ok(())
    }

    #[test]
    fn test_monotone_partition() -> Result<()> {
        let mut chf = field(8, 8, |_, _| false)?;
        build_regions_monotone(&mut BuildContext::new(), &mut chf, 0, 8, 20)?;

        assert_eq!(chf.max_regions, 1);
        assert!(chf.spans.iter().all(|s| s.reg == 1));
        Ok(())
    }

    #[test]
    fn test_border_regions_are_flagged() -> Result<()> {
        let mut chf = field(10, 10, |_, _| false)?;
        build_regions(&mut BuildContext::new(), &mut chf, 2, 1, 0)?;

        let corner = chf.spans[chf.cell(0, 0).index as usize].reg;
        assert_ne!(corner & RC_BORDER_REG, 0);
        let center = chf.spans[chf.cell(5, 5).index as usize].reg;
        assert_eq!(center & RC_BORDER_REG, 0);
        assert_ne!(center, 0);
        assert_eq!(chf.border_size, 2);
        Ok(())
    }

    #[test]
    fn test_requires_distance_field() -> Result<()> {
        let mut chf = field(4, 4, |_, _| false)?;
        chf.dist.clear();
        assert!(build_regions(&mut BuildContext::new(), &mut chf, 0, 0, 0).is_err());
        Ok(())
    }
}
