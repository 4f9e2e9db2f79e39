//! Distance field used to seed watershed regions
//!
//! Each span gets its chamfer distance to the nearest area boundary, then the
//! field is smoothed with a 3x3 box blur.

use navgeom_common::Result;

use crate::compact_heightfield::CompactHeightfield;
use crate::context::{BuildContext, TimerCategory};

/// Computes the unsmoothed distance field and its maximum value
fn calculate_distance_field(chf: &CompactHeightfield) -> (Vec<u16>, u16) {
    let mut dist = vec![u16::MAX; chf.span_count];

    // A span is on a boundary unless all four neighbors share its area
    for (x, z, i) in chf.iter_spans() {
        let same_area = (0..4)
            .filter_map(|dir| chf.neighbor(x, z, i, dir))
            .filter(|&(_, _, ni)| chf.areas[ni] == chf.areas[i])
            .count();
        if same_area != 4 {
            dist[i] = 0;
        }
    }

    let relax = |dist: &mut [u16], x: i32, z: i32, i: usize, dir: usize, diag: usize| {
        if let Some((ax, az, ai)) = chf.neighbor(x, z, i, dir) {
            dist[i] = dist[i].min(dist[ai].saturating_add(2));
            if let Some((_, _, bi)) = chf.neighbor(ax, az, ai, diag) {
                dist[i] = dist[i].min(dist[bi].saturating_add(3));
            }
        }
    };

    for z in 0..chf.height {
        for x in 0..chf.width {
            for i in chf.cell(x, z).spans() {
                relax(&mut dist, x, z, i, 0, 3);
                relax(&mut dist, x, z, i, 3, 2);
            }
        }
    }

    for z in (0..chf.height).rev() {
        for x in (0..chf.width).rev() {
            for i in chf.cell(x, z).spans() {
                relax(&mut dist, x, z, i, 2, 1);
                relax(&mut dist, x, z, i, 1, 0);
            }
        }
    }

    let max_distance = dist.iter().copied().max().unwrap_or(0);
    (dist, max_distance)
}

/// Averages every span with its eight neighbors; values at or below
/// `2 * threshold` are kept as they are
fn box_blur(chf: &CompactHeightfield, threshold: u16, src: &[u16]) -> Vec<u16> {
    let threshold = threshold * 2;
    let mut dst = vec![0u16; src.len()];

    for (x, z, i) in chf.iter_spans() {
        let cd = src[i] as u32;
        if cd <= threshold as u32 {
            dst[i] = cd as u16;
            continue;
        }

        let mut d = cd;
        for dir in 0..4 {
            match chf.neighbor(x, z, i, dir) {
                Some((ax, az, ai)) => {
                    d += src[ai] as u32;
                    let diag = (dir + 1) & 3;
                    d += chf
                        .neighbor(ax, az, ai, diag)
                        .map_or(cd, |(_, _, bi)| src[bi] as u32);
                }
                None => d += cd * 2,
            }
        }
        dst[i] = ((d + 5) / 9).min(u16::MAX as u32) as u16;
    }

    dst
}

/// Fills `chf.dist` and `chf.max_distance`
pub fn build_distance_field(ctx: &mut BuildContext, chf: &mut CompactHeightfield) -> Result<()> {
    ctx.timed(TimerCategory::DistanceField, |ctx| {
        let (dist, max_distance) = calculate_distance_field(chf);
        chf.dist = box_blur(chf, 1, &dist);
        chf.max_distance = max_distance;
        ctx.log_debug(format!("distance field: max distance {}", max_distance));
        Ok(())
    })
}
