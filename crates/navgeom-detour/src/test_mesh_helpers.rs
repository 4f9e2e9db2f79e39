//! Hand built meshes for the query tests
//!
//! A `w x h` grid of unit quads on the XZ plane at y = 0, one polygon per
//! cell, laid out row major so that the cell `(x, z)` is polygon
//! `z * w + x`. The detail surface of every quad sits one cell height above
//! the polygon, as the voxel pipeline produces it.

use glam::Vec3;
use navgeom_recast::{PolyMesh, PolyMeshDetail, MESH_NULL_IDX};

use crate::{NavMesh, PolyFlags, Result};

pub const CELL_HEIGHT: f32 = 0.2;

/// Grid of quads with every cell present
pub fn grid_mesh(w: usize, h: usize) -> (PolyMesh, PolyMeshDetail) {
    grid_mesh_with_holes(w, h, &[])
}

/// Grid of quads with the listed `(x, z)` cells left out
pub fn grid_mesh_with_holes(w: usize, h: usize, holes: &[(usize, usize)]) -> (PolyMesh, PolyMeshDetail) {
    const NVP: usize = 6;

    let vert_index = |x: usize, z: usize| (z * (w + 1) + x) as u16;
    let mut mesh = PolyMesh {
        nvp: NVP,
        bmin: Vec3::ZERO,
        bmax: Vec3::new(w as f32, 1.0, h as f32),
        cs: 1.0,
        ch: CELL_HEIGHT,
        ..Default::default()
    };
    for z in 0..=h {
        for x in 0..=w {
            mesh.verts.push([x as u16, 0, z as u16]);
        }
    }

    let present = |x: usize, z: usize| !holes.contains(&(x, z));
    let mut poly_of = vec![MESH_NULL_IDX; w * h];
    let mut count = 0u16;
    for z in 0..h {
        for x in 0..w {
            if present(x, z) {
                poly_of[z * w + x] = count;
                count += 1;
            }
        }
    }

    let mut detail = PolyMeshDetail::default();
    for z in 0..h {
        for x in 0..w {
            if !present(x, z) {
                continue;
            }
            let neighbor = |dx: isize, dz: isize| {
                let nx = x as isize + dx;
                let nz = z as isize + dz;
                if nx < 0 || nz < 0 || nx >= w as isize || nz >= h as isize {
                    return MESH_NULL_IDX;
                }
                poly_of[nz as usize * w + nx as usize]
            };

            let mut slots = [MESH_NULL_IDX; NVP * 2];
            slots[..4].copy_from_slice(&[
                vert_index(x, z),
                vert_index(x, z + 1),
                vert_index(x + 1, z + 1),
                vert_index(x + 1, z),
            ]);
            slots[NVP..NVP + 4].copy_from_slice(&[
                neighbor(-1, 0),
                neighbor(0, 1),
                neighbor(1, 0),
                neighbor(0, -1),
            ]);
            mesh.polys.extend_from_slice(&slots);
            mesh.regs.push(1);
            mesh.areas.push(63);
            mesh.flags.push(PolyFlags::WALK.bits());
            mesh.npolys += 1;

            let (fx, fz) = (x as f32, z as f32);
            detail.meshes.push([detail.verts.len() as u32, 4, detail.tris.len() as u32, 2]);
            detail.verts.extend_from_slice(&[
                Vec3::new(fx, CELL_HEIGHT, fz),
                Vec3::new(fx, CELL_HEIGHT, fz + 1.0),
                Vec3::new(fx + 1.0, CELL_HEIGHT, fz + 1.0),
                Vec3::new(fx + 1.0, CELL_HEIGHT, fz),
            ]);
            detail.tris.push([0, 1, 2, 0b0101]);
            detail.tris.push([0, 2, 3, 0b1_0100]);
        }
    }

    (mesh, detail)
}

pub fn grid_nav_mesh(w: usize, h: usize) -> Result<NavMesh> {
    let (mesh, detail) = grid_mesh(w, h);
    NavMesh::from_recast(&mesh, &detail, 2.0, 0.6, 0.9)
}

pub fn grid_nav_mesh_with_holes(w: usize, h: usize, holes: &[(usize, usize)]) -> Result<NavMesh> {
    let (mesh, detail) = grid_mesh_with_holes(w, h, holes);
    NavMesh::from_recast(&mesh, &detail, 2.0, 0.6, 0.9)
}
