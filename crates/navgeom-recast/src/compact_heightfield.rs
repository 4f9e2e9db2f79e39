//! Compact heightfield representation
//!
//! Only the open space above walkable spans is kept. Each span stores its
//! floor height, the clearance above it and links to the spans an agent can
//! step to in the four axis directions.

use glam::Vec3;

use navgeom_common::{Error, Result};

use crate::context::{BuildContext, TimerCategory};
use crate::heightfield::{Heightfield, SPAN_MAX_HEIGHT};
use crate::{get_dir_offset_x, get_dir_offset_y, reserve_or_abort, RC_NULL_AREA};

/// Marks a missing neighbor link
pub const RC_NOT_CONNECTED: u8 = 0x3f;

/// Largest layer index a neighbor link can address
const MAX_LAYERS: usize = RC_NOT_CONNECTED as usize - 1;

/// Region id bit for spans inside the border margin
pub const RC_BORDER_REG: u16 = 0x8000;

/// Spans of one grid cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactCell {
    /// Index of the first span of the cell
    pub index: u32,
    pub count: u32,
}

impl CompactCell {
    pub fn spans(&self) -> std::ops::Range<usize> {
        self.index as usize..(self.index + self.count) as usize
    }
}

/// Open space above a walkable floor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSpan {
    /// Floor height
    pub y: u16,
    /// Region id, 0 when unassigned
    pub reg: u16,
    /// Clearance above the floor
    pub h: u8,
    con: [u8; 4],
}

impl CompactSpan {
    fn new(y: u16, h: u8) -> Self {
        Self {
            y,
            reg: 0,
            h,
            con: [RC_NOT_CONNECTED; 4],
        }
    }

    /// Layer index of the neighbor in `dir` within its cell
    pub fn con(&self, dir: usize) -> Option<usize> {
        let c = self.con[dir & 3];
        (c != RC_NOT_CONNECTED).then_some(c as usize)
    }

    pub fn set_con(&mut self, dir: usize, layer: Option<usize>) {
        self.con[dir & 3] = layer.map_or(RC_NOT_CONNECTED, |l| l as u8);
    }
}

#[derive(Debug, Clone)]
pub struct CompactHeightfield {
    pub width: i32,
    pub height: i32,
    pub span_count: usize,
    /// Agent height in cell-height units
    pub walkable_height: i32,
    /// Agent climb in cell-height units
    pub walkable_climb: i32,
    pub border_size: i32,
    /// Largest value in `dist`
    pub max_distance: u16,
    /// Largest region id in use
    pub max_regions: u16,
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cs: f32,
    pub ch: f32,
    pub cells: Vec<CompactCell>,
    pub spans: Vec<CompactSpan>,
    /// Distance to the nearest boundary, per span; empty until computed
    pub dist: Vec<u16>,
    /// Area id per span
    pub areas: Vec<u8>,
}

impl CompactHeightfield {
    /// Builds the compact representation of every walkable span.
    ///
    /// Neighbors are linked when the shared opening is at least
    /// `walkable_height` tall and the floors differ by at most
    /// `walkable_climb`.
    pub fn build(
        ctx: &mut BuildContext,
        walkable_height: i32,
        walkable_climb: i32,
        hf: &Heightfield,
    ) -> Result<Self> {
        ctx.timed(TimerCategory::CompactHeightfield, |ctx| -> Result<Self> {
            let w = hf.width;
            let h = hf.height;
            let span_count = hf.walkable_span_count();
            if span_count == 0 {
                return Err(Error::NavMeshGeneration(
                    "heightfield has no walkable spans".to_string(),
                ));
            }

            let mut chf = Self {
                width: w,
                height: h,
                span_count,
                walkable_height,
                walkable_climb,
                border_size: 0,
                max_distance: 0,
                max_regions: 0,
                bmin: hf.bmin,
                bmax: hf.bmax + Vec3::new(0.0, walkable_height as f32 * hf.ch, 0.0),
                cs: hf.cs,
                ch: hf.ch,
                cells: Vec::new(),
                spans: Vec::new(),
                dist: Vec::new(),
                areas: Vec::new(),
            };

            reserve_or_abort(&mut chf.cells, (w * h) as usize);
            reserve_or_abort(&mut chf.spans, span_count);
            reserve_or_abort(&mut chf.areas, span_count);

            let max_height = SPAN_MAX_HEIGHT as i32;
            for z in 0..h {
                for x in 0..w {
                    let column = hf.column(x, z);
                    let index = chf.spans.len() as u32;
                    for (i, span) in column.iter().enumerate() {
                        if span.area == RC_NULL_AREA {
                            continue;
                        }
                        let bottom = span.smax as i32;
                        let top = column.get(i + 1).map_or(max_height, |s| s.smin as i32);
                        chf.spans.push(CompactSpan::new(
                            bottom.clamp(0, 0xffff) as u16,
                            (top - bottom).clamp(0, 0xff) as u8,
                        ));
                        chf.areas.push(span.area);
                    }
                    chf.cells.push(CompactCell {
                        index,
                        count: chf.spans.len() as u32 - index,
                    });
                }
            }

            let too_many_layers = chf.link_neighbors();
            if too_many_layers > 0 {
                ctx.log_warning(format!(
                    "{} neighbor links exceed {} layers and were dropped",
                    too_many_layers, MAX_LAYERS
                ));
            }

            ctx.log_debug(format!("compact heightfield: {} spans", chf.span_count));
            Ok(chf)
        })
    }

    /// Links every span to its walkable neighbors, returning the number of
    /// links that could not be stored.
    fn link_neighbors(&mut self) -> usize {
        let mut dropped = 0;
        for z in 0..self.height {
            for x in 0..self.width {
                let cell = self.cell(x, z);
                for i in cell.spans() {
                    for dir in 0..4 {
                        self.spans[i].set_con(dir, None);
                        let nx = x + get_dir_offset_x(dir);
                        let nz = z + get_dir_offset_y(dir);
                        if nx < 0 || nz < 0 || nx >= self.width || nz >= self.height {
                            continue;
                        }

                        let s = self.spans[i];
                        let ncell = self.cell(nx, nz);
                        for k in ncell.spans() {
                            let ns = self.spans[k];
                            let bottom = s.y.max(ns.y) as i32;
                            let top = (s.y as i32 + s.h as i32).min(ns.y as i32 + ns.h as i32);

                            if top - bottom >= self.walkable_height
                                && (ns.y as i32 - s.y as i32).abs() <= self.walkable_climb
                            {
                                let layer = k - ncell.index as usize;
                                if layer > MAX_LAYERS {
                                    dropped += 1;
                                    continue;
                                }
                                self.spans[i].set_con(dir, Some(layer));
                                break;
                            }
                        }
                    }
                }
            }
        }
        dropped
    }

    pub fn cell(&self, x: i32, z: i32) -> CompactCell {
        self.cells[(x + z * self.width) as usize]
    }

    /// Neighbor of span `i` at `(x, z)` in direction `dir`, as
    /// `(nx, nz, span index)`
    pub fn neighbor(&self, x: i32, z: i32, i: usize, dir: usize) -> Option<(i32, i32, usize)> {
        let layer = self.spans[i].con(dir)?;
        let nx = x + get_dir_offset_x(dir);
        let nz = z + get_dir_offset_y(dir);
        Some((nx, nz, self.cell(nx, nz).index as usize + layer))
    }

    /// Iterates `(x, z, span index)` over every span in row-major order
    pub fn iter_spans(&self) -> impl Iterator<Item = (i32, i32, usize)> + '_ {
        (0..self.height).flat_map(move |z| {
            (0..self.width).flat_map(move |x| self.cell(x, z).spans().map(move |i| (x, z, i)))
        })
    }
}
