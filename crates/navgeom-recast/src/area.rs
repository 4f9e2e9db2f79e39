//! Walkable area marking: triangle slope tests and erosion

use glam::Vec3;

use navgeom_common::{tri_normal, Result};

use crate::compact_heightfield::CompactHeightfield;
use crate::context::{BuildContext, TimerCategory};
use crate::RC_NULL_AREA;

/// Clears the area of triangles steeper than `walkable_slope_angle` degrees.
///
/// Both windings are accepted, so flat input is walkable whichever way its
/// triangles face. Triangles with out-of-range indices are left untouched.
pub fn clear_unwalkable_triangles(
    walkable_slope_angle: f32,
    vertices: &[Vec3],
    triangles: &[[u32; 3]],
    areas: &mut [u8],
) -> usize {
    let walkable_thr = walkable_slope_angle.to_radians().cos();
    let mut cleared = 0;

    for (tri, area) in triangles.iter().zip(areas.iter_mut()) {
        let (Some(&v0), Some(&v1), Some(&v2)) = (
            vertices.get(tri[0] as usize),
            vertices.get(tri[1] as usize),
            vertices.get(tri[2] as usize),
        ) else {
            continue;
        };

        let normal = tri_normal(v0, v1, v2);
        if normal.y.abs() <= walkable_thr && *area != RC_NULL_AREA {
            *area = RC_NULL_AREA;
            cleared += 1;
        }
    }

    cleared
}

/// Two-pass chamfer distance transform from unwalkable or unlinked spans,
/// using 2 for axis steps and 3 for diagonal steps
fn distance_to_boundary(chf: &CompactHeightfield) -> Vec<u8> {
    let mut dist = vec![0xff_u8; chf.span_count];

    for (x, z, i) in chf.iter_spans() {
        if chf.areas[i] == RC_NULL_AREA {
            dist[i] = 0;
            continue;
        }
        let linked = (0..4)
            .filter_map(|dir| chf.neighbor(x, z, i, dir))
            .filter(|&(_, _, ni)| chf.areas[ni] != RC_NULL_AREA)
            .count();
        if linked != 4 {
            dist[i] = 0;
        }
    }

    let relax = |dist: &mut [u8], x: i32, z: i32, i: usize, dir: usize, diag: usize| {
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
                // (-1, 0) then (-1, -1)
                relax(&mut dist, x, z, i, 0, 3);
                // (0, -1) then (1, -1)
                relax(&mut dist, x, z, i, 3, 2);
            }
        }
    }

    for z in (0..chf.height).rev() {
        for x in (0..chf.width).rev() {
            for i in chf.cell(x, z).spans() {
                // (1, 0) then (1, 1)
                relax(&mut dist, x, z, i, 2, 1);
                // (0, 1) then (-1, 1)
                relax(&mut dist, x, z, i, 1, 0);
            }
        }
    }

    dist
}

/// Clears every span closer than `radius` cells to an unwalkable boundary
pub fn erode_walkable_area(ctx: &mut BuildContext, radius: i32, chf: &mut CompactHeightfield) -> Result<()> {
    ctx.timed(TimerCategory::Erosion, |ctx| {
        let dist = distance_to_boundary(chf);
        let threshold = (radius * 2).clamp(0, 255) as u8;

        let mut eroded = 0;
        for (area, d) in chf.areas.iter_mut().zip(dist) {
            if d < threshold && *area != RC_NULL_AREA {
                *area = RC_NULL_AREA;
                eroded += 1;
            }
        }

        ctx.log_debug(format!("erosion by {} cells cleared {} spans", radius, eroded));
        Ok(())
    })
}
