//! Triangle rasterization into a heightfield
//!
//! Each triangle is clipped row by row and then cell by cell against the
//! grid; the vertical extent of every clipped piece becomes a span.

use glam::Vec3;

use navgeom_common::{overlap_bounds, Error, Result};

use crate::context::{BuildContext, TimerCategory};
use crate::heightfield::{Heightfield, SPAN_MAX_HEIGHT};

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Z,
}

impl Axis {
    fn of(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Z => v.z,
        }
    }
}

/// Splits a convex polygon by the plane `axis = offset`.
///
/// The part below the plane goes to `below`, the rest to `above`.
fn divide_poly(input: &[Vec3], below: &mut Vec<Vec3>, above: &mut Vec<Vec3>, offset: f32, axis: Axis) {
    below.clear();
    above.clear();

    let n = input.len();
    if n == 0 {
        return;
    }

    let delta: Vec<f32> = input.iter().map(|v| offset - axis.of(*v)).collect();

    for i in 0..n {
        let j = (i + n - 1) % n;
        let (a, b) = (input[j], input[i]);
        let (da, db) = (delta[j], delta[i]);

        let a_below = da >= 0.0;
        let b_below = db >= 0.0;
        if a_below != b_below {
            let s = da / (da - db);
            let p = a + (b - a) * s;
            below.push(p);
            above.push(p);

            // The intersection already covers a point on the plane
            if db > 0.0 {
                below.push(b);
            } else if db < 0.0 {
                above.push(b);
            }
            continue;
        }

        if db >= 0.0 {
            below.push(b);
            if db != 0.0 {
                continue;
            }
        }
        above.push(b);
    }
}

/// Rasterizes one triangle.
///
/// Triangles outside the heightfield bounds are skipped.
pub fn rasterize_triangle(
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    area: u8,
    heightfield: &mut Heightfield,
    flag_merge_threshold: i32,
) -> Result<()> {
    let tri_min = v0.min(v1).min(v2);
    let tri_max = v0.max(v1).max(v2);

    if !overlap_bounds(tri_min, tri_max, heightfield.bmin, heightfield.bmax) {
        return Ok(());
    }

    let w = heightfield.width;
    let h = heightfield.height;
    let cs = heightfield.cs;
    let inverse_cs = 1.0 / cs;
    let inverse_ch = 1.0 / heightfield.ch;
    let bmin = heightfield.bmin;
    let by = heightfield.bmax.y - bmin.y;

    let z0 = (((tri_min.z - bmin.z) * inverse_cs) as i32).clamp(-1, h - 1);
    let z1 = (((tri_max.z - bmin.z) * inverse_cs) as i32).clamp(0, h - 1);

    let mut remaining = vec![v0, v1, v2];
    let mut row = Vec::with_capacity(7);
    let mut rest = Vec::with_capacity(7);
    let mut cell = Vec::with_capacity(7);
    let mut row_rest = Vec::with_capacity(7);

    for z in z0..=z1 {
        let cell_z = bmin.z + z as f32 * cs;
        divide_poly(&remaining, &mut row, &mut rest, cell_z + cs, Axis::Z);
        std::mem::swap(&mut remaining, &mut rest);

        if row.len() < 3 || z < 0 {
            continue;
        }

        let (min_x, max_x) = row
            .iter()
            .fold((row[0].x, row[0].x), |(lo, hi), v| (lo.min(v.x), hi.max(v.x)));
        let x0 = ((min_x - bmin.x) * inverse_cs) as i32;
        let x1 = ((max_x - bmin.x) * inverse_cs) as i32;
        if x1 < 0 || x0 >= w {
            continue;
        }
        let x0 = x0.clamp(-1, w - 1);
        let x1 = x1.clamp(0, w - 1);

        for x in x0..=x1 {
            let cell_x = bmin.x + x as f32 * cs;
            divide_poly(&row, &mut cell, &mut row_rest, cell_x + cs, Axis::X);
            std::mem::swap(&mut row, &mut row_rest);

            if cell.len() < 3 || x < 0 {
                continue;
            }

            let (span_min, span_max) = cell
                .iter()
                .fold((cell[0].y, cell[0].y), |(lo, hi), v| (lo.min(v.y), hi.max(v.y)));
            let span_min = span_min - bmin.y;
            let span_max = span_max - bmin.y;

            if span_max < 0.0 || span_min > by {
                continue;
            }
            let span_min = span_min.max(0.0);
            let span_max = span_max.min(by);

            let max = SPAN_MAX_HEIGHT as i32;
            let ismin = ((span_min * inverse_ch).floor() as i32).clamp(0, max);
            let ismax = ((span_max * inverse_ch).ceil() as i32).clamp(ismin + 1, max);

            heightfield.add_span(x, z, ismin as u16, ismax as u16, area, flag_merge_threshold)?;
        }
    }

    Ok(())
}

/// Rasterizes an indexed triangle list with one area id per triangle
pub fn rasterize_triangles(
    ctx: &mut BuildContext,
    vertices: &[Vec3],
    triangles: &[[u32; 3]],
    areas: &[u8],
    heightfield: &mut Heightfield,
    flag_merge_threshold: i32,
) -> Result<()> {
    if triangles.len() != areas.len() {
        return Err(Error::InvalidMesh(format!(
            "{} triangles but {} area ids",
            triangles.len(),
            areas.len()
        )));
    }

    ctx.timed(TimerCategory::Rasterization, |ctx| -> Result<()> {
        for (i, (tri, &area)) in triangles.iter().zip(areas).enumerate() {
            let corner = |k: usize| {
                vertices.get(tri[k] as usize).copied().ok_or_else(|| {
                    Error::InvalidMesh(format!(
                        "triangle {} references vertex {} of {}",
                        i,
                        tri[k],
                        vertices.len()
                    ))
                })
            };
            rasterize_triangle(corner(0)?, corner(1)?, corner(2)?, area, heightfield, flag_merge_threshold)?;
        }

        ctx.log_debug(format!(
            "rasterized {} triangles into {} spans",
            triangles.len(),
            heightfield.span_count()
        ));
        Ok(())
    })
}
