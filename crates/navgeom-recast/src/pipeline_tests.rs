//! End to end tests of the voxel pipeline, from triangles to detail mesh

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use navgeom_common::Result;

    use crate::{
        BuildContext, PolyMesh, PolyMeshDetail, RecastBuilder, RecastConfig, RegionPartition,
        TimerCategory, MESH_NULL_IDX, RC_WALKABLE_AREA,
    };

    /// Axis aligned quad at height `y`, two triangles
    fn quad(verts: &mut Vec<Vec3>, tris: &mut Vec<[u32; 3]>, min: (f32, f32), max: (f32, f32), y: f32) {
        let base = verts.len() as u32;
        verts.extend_from_slice(&[
            Vec3::new(min.0, y, min.1),
            Vec3::new(min.0, y, max.1),
            Vec3::new(max.0, y, max.1),
            Vec3::new(max.0, y, min.1),
        ]);
        tris.push([base, base + 1, base + 2]);
        tris.push([base, base + 2, base + 3]);
    }

    fn config(bmax: Vec3) -> RecastConfig {
        RecastConfig::from_agent(0.3, 0.2, 2.0, 0.6, 0.9, 45.0, Vec3::new(0.0, -1.0, 0.0), bmax)
    }

    fn build(
        cfg: RecastConfig,
        verts: &[Vec3],
        tris: &[[u32; 3]],
    ) -> Result<(BuildContext, PolyMesh, PolyMeshDetail)> {
        let areas = vec![RC_WALKABLE_AREA; tris.len()];
        let mut ctx = BuildContext::new();
        let (pmesh, dmesh) = RecastBuilder::new(cfg).build(&mut ctx, verts, tris, &areas)?;
        Ok((ctx, pmesh, dmesh))
    }

    fn world_vertex(mesh: &PolyMesh, v: usize) -> Vec3 {
        let [x, y, z] = mesh.verts[v];
        mesh.bmin + Vec3::new(x as f32 * mesh.cs, y as f32 * mesh.ch, z as f32 * mesh.cs)
    }

    #[test]
    fn test_flat_plane() -> Result<()> {
        let mut verts = Vec::new();
        let mut tris = Vec::new();
        quad(&mut verts, &mut tris, (0.0, 0.0), (12.0, 12.0), 0.0);

        let (ctx, pmesh, dmesh) = build(config(Vec3::new(12.0, 3.0, 12.0)), &verts, &tris)?;

        assert!(pmesh.npolys > 0);
        assert_eq!(dmesh.meshes.len(), pmesh.npolys);

        // eroded by the agent radius on every side
        for v in 0..pmesh.nverts() {
            let p = world_vertex(&pmesh, v);
            assert!(p.x >= 0.5 && p.x <= 11.5, "x {} not eroded", p.x);
            assert!(p.z >= 0.5 && p.z <= 11.5, "z {} not eroded", p.z);
        }

        // detail surface sits just above the floor
        for v in &dmesh.verts {
            assert!(v.y > -0.1 && v.y < 0.5, "detail height {}", v.y);
        }

        assert!(pmesh.flags.iter().all(|&f| f == 0));
        assert!(pmesh.areas.iter().all(|&a| a == RC_WALKABLE_AREA));
        assert!(ctx.timer_count(TimerCategory::Total) == 1);
        assert!(ctx.timer_duration(TimerCategory::Contours).is_some());
        Ok(())
    }

    #[test]
    fn test_separate_platforms_are_not_linked() -> Result<()> {
        let mut verts = Vec::new();
        let mut tris = Vec::new();
        quad(&mut verts, &mut tris, (0.0, 0.0), (6.0, 6.0), 0.0);
        quad(&mut verts, &mut tris, (9.0, 0.0), (15.0, 6.0), 0.0);

        let (_, pmesh, _) = build(config(Vec3::new(15.0, 3.0, 6.0)), &verts, &tris)?;

        let side = |p: usize| {
            let first = pmesh.poly(p)[0] as usize;
            world_vertex(&pmesh, first).x < 7.5
        };

        assert!((0..pmesh.npolys).any(side));
        assert!((0..pmesh.npolys).any(|p| !side(p)));

        for p in 0..pmesh.npolys {
            for &nei in pmesh.neighbors(p) {
                if nei & 0x8000 != 0 || nei == MESH_NULL_IDX {
                    continue;
                }
                assert_eq!(side(p), side(nei as usize));
            }
        }
        Ok(())
    }

    #[test]
    fn test_steep_input_is_unwalkable() {
        // a wall rising along y
        let verts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 6.0, 0.0),
            Vec3::new(6.0, 6.0, 0.0),
            Vec3::new(6.0, 0.0, 0.0),
        ];
        let tris = vec![[0, 1, 2], [0, 2, 3]];

        let cfg = config(Vec3::new(6.0, 7.0, 1.0));
        assert!(build(cfg, &verts, &tris).is_err());
    }

    #[test]
    fn test_monotone_partition() -> Result<()> {
        let mut verts = Vec::new();
        let mut tris = Vec::new();
        quad(&mut verts, &mut tris, (0.0, 0.0), (8.0, 8.0), 0.0);

        let mut cfg = config(Vec3::new(8.0, 3.0, 8.0));
        cfg.region_partition = RegionPartition::Monotone;
        let (_, pmesh, dmesh) = build(cfg, &verts, &tris)?;

        assert!(pmesh.npolys > 0);
        assert!(dmesh.ntris() >= pmesh.npolys);
        Ok(())
    }

    #[test]
    fn test_caller_areas_untouched() -> Result<()> {
        let verts = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 6.0, 0.0),
            Vec3::new(6.0, 6.0, 0.0),
            Vec3::new(0.0, 0.0, 8.0),
            Vec3::new(8.0, 0.0, 8.0),
            Vec3::new(8.0, 0.0, 0.0),
        ];
        let tris = vec![[0, 1, 2], [0, 3, 4], [0, 4, 5]];
        let areas = vec![RC_WALKABLE_AREA; 3];

        let mut ctx = BuildContext::new();
        RecastBuilder::new(config(Vec3::new(8.0, 7.0, 8.0))).build(&mut ctx, &verts, &tris, &areas)?;

        assert!(areas.iter().all(|&a| a == RC_WALKABLE_AREA));
        Ok(())
    }
}
