//! Heightfield representation
//!
//! The heightfield is the first data structure in the pipeline: a 2D grid of
//! columns, each holding the solid spans rasterized into it, sorted bottom to
//! top and never overlapping.

use glam::Vec3;

use navgeom_common::{Error, Result};

use crate::{get_dir_offset_x, get_dir_offset_y, reserve_or_abort, RC_NULL_AREA};

/// Largest span height, in cell-height units
pub const SPAN_MAX_HEIGHT: u16 = (1 << 13) - 1;

/// A solid span of voxels within a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Lower limit of the span
    pub smin: u16,
    /// Upper limit of the span; the walkable floor when `area` is set
    pub smax: u16,
    /// Area id; [`RC_NULL_AREA`] marks an unwalkable surface
    pub area: u8,
}

/// Grid of span columns over the XZ plane
#[derive(Debug)]
pub struct Heightfield {
    /// Number of cells along x
    pub width: i32,
    /// Number of cells along z
    pub height: i32,
    pub bmin: Vec3,
    pub bmax: Vec3,
    /// Cell size on the XZ plane
    pub cs: f32,
    /// Cell height along y
    pub ch: f32,
    columns: Vec<Vec<Span>>,
}

impl Heightfield {
    /// Creates an empty heightfield.
    ///
    /// Failing to allocate the column grid is fatal.
    pub fn new(width: i32, height: i32, bmin: Vec3, bmax: Vec3, cs: f32, ch: f32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::NavMeshGeneration(format!(
                "invalid heightfield size {}x{}",
                width, height
            )));
        }

        let cells = width as usize * height as usize;
        let mut columns = Vec::new();
        reserve_or_abort(&mut columns, cells);
        columns.resize_with(cells, Vec::new);

        Ok(Self {
            width,
            height,
            bmin,
            bmax,
            cs,
            ch,
            columns,
        })
    }

    fn column_index(&self, x: i32, z: i32) -> Option<usize> {
        if x < 0 || z < 0 || x >= self.width || z >= self.height {
            return None;
        }
        Some((x + z * self.width) as usize)
    }

    /// Spans of the column at `(x, z)`, bottom to top
    pub fn column(&self, x: i32, z: i32) -> &[Span] {
        self.column_index(x, z)
            .map_or(&[], |i| self.columns[i].as_slice())
    }

    /// Inserts a span, merging it with every span it overlaps.
    ///
    /// When the merged top is within `flag_merge_threshold` of an existing
    /// span's top, the higher area id wins. Out-of-grid positions are ignored.
    pub fn add_span(
        &mut self,
        x: i32,
        z: i32,
        smin: u16,
        smax: u16,
        area: u8,
        flag_merge_threshold: i32,
    ) -> Result<()> {
        if smin > smax {
            return Err(Error::NavMeshGeneration(format!(
                "invalid span height: min ({}) > max ({})",
                smin, smax
            )));
        }
        let Some(index) = self.column_index(x, z) else {
            return Ok(());
        };

        let column = &mut self.columns[index];
        let mut span = Span { smin, smax, area };

        let mut i = 0;
        while i < column.len() {
            let cur = column[i];
            if cur.smin > span.smax {
                break;
            }
            if cur.smax < span.smin {
                i += 1;
                continue;
            }

            span.smin = span.smin.min(cur.smin);
            span.smax = span.smax.max(cur.smax);
            if (span.smax as i32 - cur.smax as i32).abs() <= flag_merge_threshold {
                span.area = span.area.max(cur.area);
            }
            column.remove(i);
        }

        column.insert(i, span);
        Ok(())
    }

    /// Total number of spans
    pub fn span_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Number of spans with a walkable area
    pub fn walkable_span_count(&self) -> usize {
        self.columns
            .iter()
            .flatten()
            .filter(|s| s.area != RC_NULL_AREA)
            .count()
    }

    /// Marks unwalkable spans as walkable when their top is within
    /// `walkable_climb` of the walkable span directly below.
    ///
    /// Lets agents step over curbs and stair risers.
    pub fn filter_low_hanging_walkable_obstacles(&mut self, walkable_climb: i32) {
        for column in &mut self.columns {
            let mut previous: Option<Span> = None;
            let mut previous_walkable = false;

            for span in column.iter_mut() {
                let walkable = span.area != RC_NULL_AREA;
                if let Some(prev) = previous {
                    if !walkable
                        && previous_walkable
                        && (span.smax as i32 - prev.smax as i32).abs() <= walkable_climb
                    {
                        span.area = prev.area;
                    }
                }
                previous_walkable = walkable;
                previous = Some(*span);
            }
        }
    }

    /// Marks spans as unwalkable when they sit on a ledge.
    ///
    /// A ledge is a span with a neighbor floor more than `walkable_climb`
    /// below it, or whose reachable neighbor floors differ by more than
    /// `walkable_climb`. Spans at the grid border count as ledges.
    pub fn filter_ledge_spans(&mut self, walkable_height: i32, walkable_climb: i32) {
        let max_height = SPAN_MAX_HEIGHT as i32;
        let mut cleared = Vec::new();

        for z in 0..self.height {
            for x in 0..self.width {
                let column = self.column(x, z);
                for (i, span) in column.iter().enumerate() {
                    if span.area == RC_NULL_AREA {
                        continue;
                    }

                    let floor = span.smax as i32;
                    let ceiling = column.get(i + 1).map_or(max_height, |s| s.smin as i32);
                    if self.is_ledge(x, z, floor, ceiling, walkable_height, walkable_climb) {
                        cleared.push((x, z, i));
                    }
                }
            }
        }

        for (x, z, i) in cleared {
            if let Some(index) = self.column_index(x, z) {
                self.columns[index][i].area = RC_NULL_AREA;
            }
        }
    }

    fn is_ledge(
        &self,
        x: i32,
        z: i32,
        floor: i32,
        ceiling: i32,
        walkable_height: i32,
        walkable_climb: i32,
    ) -> bool {
        let max_height = SPAN_MAX_HEIGHT as i32;
        let mut lowest_difference = max_height;
        let mut lowest_traversable = floor;
        let mut highest_traversable = floor;

        for dir in 0..4 {
            let nx = x + get_dir_offset_x(dir);
            let nz = z + get_dir_offset_y(dir);
            if self.column_index(nx, nz).is_none() {
                return true;
            }

            let neighbors = self.column(nx, nz);

            // Gap below the lowest neighbor span
            let neighbor_ceiling = neighbors.first().map_or(max_height, |s| s.smin as i32);
            if ceiling.min(neighbor_ceiling) - floor >= walkable_height {
                return true;
            }

            for (j, neighbor) in neighbors.iter().enumerate() {
                let neighbor_floor = neighbor.smax as i32;
                let neighbor_ceiling = neighbors.get(j + 1).map_or(max_height, |s| s.smin as i32);

                if ceiling.min(neighbor_ceiling) - floor.max(neighbor_floor) < walkable_height {
                    continue;
                }

                let difference = neighbor_floor - floor;
                lowest_difference = lowest_difference.min(difference);

                if difference.abs() <= walkable_climb {
                    lowest_traversable = lowest_traversable.min(neighbor_floor);
                    highest_traversable = highest_traversable.max(neighbor_floor);
                } else if difference < -walkable_climb {
                    return true;
                }
            }
        }

        lowest_difference < -walkable_climb
            || highest_traversable - lowest_traversable > walkable_climb
    }

    /// Marks spans as unwalkable when the free space above them is lower
    /// than `walkable_height`.
    pub fn filter_walkable_low_height_spans(&mut self, walkable_height: i32) {
        let max_height = SPAN_MAX_HEIGHT as i32;
        for column in &mut self.columns {
            for i in 0..column.len() {
                let floor = column[i].smax as i32;
                let ceiling = column.get(i + 1).map_or(max_height, |s| s.smin as i32);
                if ceiling - floor < walkable_height {
                    column[i].area = RC_NULL_AREA;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RC_WALKABLE_AREA;

    fn field(width: i32, height: i32) -> Result<Heightfield> {
        Heightfield::new(
            width,
            height,
            Vec3::ZERO,
            Vec3::new(width as f32, 10.0, height as f32),
            1.0,
            0.5,
        )
    }

    #[test]
    fn test_invalid_size() {
        assert!(field(0, 4).is_err());
    }

    #[test]
    fn test_add_span_keeps_order_and_merges() -> Result<()> {
        let mut hf = field(2, 2)?;
        hf.add_span(0, 0, 10, 12, 1, 1)?;
        hf.add_span(0, 0, 0, 2, 1, 1)?;
        hf.add_span(0, 0, 5, 6, 1, 1)?;
        assert_eq!(
            hf.column(0, 0).iter().map(|s| (s.smin, s.smax)).collect::<Vec<_>>(),
            vec![(0, 2), (5, 6), (10, 12)]
        );

        // bridges the two upper spans
        hf.add_span(0, 0, 6, 10, 2, 1)?;
        assert_eq!(hf.column(0, 0).len(), 2);
        assert_eq!(hf.column(0, 0)[1], Span { smin: 5, smax: 12, area: 2 });

        // ignored outside the grid
        hf.add_span(5, 5, 0, 1, 1, 1)?;
        assert_eq!(hf.span_count(), 2);
        assert!(hf.add_span(1, 1, 3, 1, 1, 1).is_err());
        Ok(())
    }

    #[test]
    fn test_merge_area_threshold() -> Result<()> {
        let mut hf = field(1, 1)?;
        hf.add_span(0, 0, 0, 10, RC_WALKABLE_AREA, 1)?;
        hf.add_span(0, 0, 2, 4, RC_NULL_AREA, 1)?;
        assert_eq!(hf.column(0, 0)[0].area, RC_WALKABLE_AREA);

        let mut hf = field(1, 1)?;
        hf.add_span(0, 0, 0, 4, RC_WALKABLE_AREA, 1)?;
        hf.add_span(0, 0, 2, 10, RC_NULL_AREA, 1)?;
        assert_eq!(hf.column(0, 0)[0].area, RC_NULL_AREA);
        Ok(())
    }

    #[test]
    fn test_low_hanging_obstacle_becomes_walkable() -> Result<()> {
        let mut hf = field(1, 1)?;
        hf.add_span(0, 0, 0, 2, RC_WALKABLE_AREA, 0)?;
        hf.add_span(0, 0, 3, 3, RC_NULL_AREA, 0)?;
        hf.add_span(0, 0, 10, 20, RC_NULL_AREA, 0)?;

        hf.filter_low_hanging_walkable_obstacles(1);
        let areas: Vec<u8> = hf.column(0, 0).iter().map(|s| s.area).collect();
        assert_eq!(areas, vec![RC_WALKABLE_AREA, RC_WALKABLE_AREA, RC_NULL_AREA]);
        Ok(())
    }

    #[test]
    fn test_ledge_filter_clears_border_and_drops() -> Result<()> {
        let mut hf = field(5, 5)?;
        for z in 0..5 {
            for x in 0..5 {
                let top = if x == 2 && z == 2 { 20 } else { 2 };
                hf.add_span(x, z, 0, top, RC_WALKABLE_AREA, 1)?;
            }
        }

        hf.filter_ledge_spans(4, 2);

        // border cells and the tall pillar are ledges
        assert_eq!(hf.column(0, 0)[0].area, RC_NULL_AREA);
        assert_eq!(hf.column(2, 2)[0].area, RC_NULL_AREA);
        assert_eq!(hf.column(1, 1)[0].area, RC_WALKABLE_AREA);
        assert_eq!(hf.walkable_span_count(), 8);
        Ok(())
    }

    #[test]
    fn test_low_height_filter() -> Result<()> {
        let mut hf = field(1, 1)?;
        hf.add_span(0, 0, 0, 2, RC_WALKABLE_AREA, 1)?;
        hf.add_span(0, 0, 4, 5, RC_WALKABLE_AREA, 1)?;

        hf.filter_walkable_low_height_spans(3);
        assert_eq!(hf.column(0, 0)[0].area, RC_NULL_AREA);
        assert_eq!(hf.column(0, 0)[1].area, RC_WALKABLE_AREA);
        Ok(())
    }
}
