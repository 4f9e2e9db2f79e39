//! Bake and query scenarios over whole navigation meshes

use glam::Vec3;
use navgeom_common::render::{Color, DrawList};
use navgeom_common::{Result, Vec2};
use navgeom_navmesh::{NavMesh, NavMeshConfig, TimerCategory};
use navgeom_polygon::Polygon;

fn config() -> NavMeshConfig {
    NavMeshConfig {
        cell_size: 0.25,
        cell_height: 0.2,
        agent_height: 2.0,
        agent_radius: 0.5,
        agent_max_climb: 0.9,
        agent_max_slope: 45.0,
    }
}

fn square_2d(min: f64, max: f64) -> Vec<Vec2> {
    vec![
        Vec2::new(min, min),
        Vec2::new(max, min),
        Vec2::new(max, max),
        Vec2::new(min, max),
    ]
}

const SQUARE_TRIS: [[u32; 3]; 2] = [[0, 1, 2], [0, 2, 3]];

fn flat_square() -> Result<NavMesh> {
    let mut mesh = NavMesh::new();
    mesh.build_2d(&square_2d(0.0, 10.0), &SQUARE_TRIS, &[1, 1], &config())?;
    Ok(mesh)
}

#[test]
fn test_flat_square_path() -> Result<()> {
    let mesh = flat_square()?;
    assert!(mesh.is_built());

    let path = mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), &[]);
    assert!(!path.is_empty());

    let first = path[0];
    let last = path[path.len() - 1];
    assert!(first.distance(Vec2::new(1.0, 1.0)) < 0.1, "first {:?}", first);
    assert!(last.distance(Vec2::new(9.0, 9.0)) < 0.1, "last {:?}", last);
    for p in &path {
        assert!((0.0..=10.0).contains(&p.x) && (0.0..=10.0).contains(&p.y), "{:?}", p);
    }
    Ok(())
}

#[test]
fn test_far_points_give_empty_path() -> Result<()> {
    let mesh = flat_square()?;
    assert!(mesh.query_2d(Vec2::new(-50.0, -50.0), Vec2::new(9.0, 9.0), &[]).is_empty());
    assert!(mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(40.0, 5.0), &[]).is_empty());
    Ok(())
}

#[test]
fn test_rebuild_replaces_previous_bake() -> Result<()> {
    let mut mesh = flat_square()?;
    mesh.build_2d(&square_2d(20.0, 30.0), &SQUARE_TRIS, &[1, 1], &config())?;

    assert!(mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), &[]).is_empty());
    assert!(!mesh.query_2d(Vec2::new(21.0, 21.0), Vec2::new(29.0, 29.0), &[]).is_empty());
    Ok(())
}

#[test]
fn test_failed_build_leaves_mesh_unbuilt() -> Result<()> {
    let mut mesh = flat_square()?;

    let result = mesh.build_2d(&square_2d(0.0, 10.0), &SQUARE_TRIS, &[1], &config());
    assert!(result.is_err());
    assert!(!mesh.is_built());
    assert!(mesh.last_build_stats().is_none());
    assert!(mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), &[]).is_empty());
    Ok(())
}

#[test]
fn test_unwalkable_area_ids_fail() {
    let mut mesh = NavMesh::new();
    let result = mesh.build_2d(&square_2d(0.0, 10.0), &SQUARE_TRIS, &[64, 200], &config());
    assert!(result.is_err());
    assert!(!mesh.is_built());

    let result = mesh.build_2d(&square_2d(0.0, 10.0), &SQUARE_TRIS, &[0, 0], &config());
    assert!(result.is_err());
}

#[test]
fn test_empty_input_fails() {
    let mut mesh = NavMesh::new();
    assert!(mesh.build(&[], &[], &[], &config()).is_err());

    let bad_config = NavMeshConfig {
        cell_size: -1.0,
        ..config()
    };
    assert!(mesh
        .build_2d(&square_2d(0.0, 10.0), &SQUARE_TRIS, &[1, 1], &bad_config)
        .is_err());
}

#[test]
fn test_raised_floor_in_3d() -> Result<()> {
    let y = 2.0;
    let vertices = [
        Vec3::new(0.0, y, 0.0),
        Vec3::new(0.0, y, 10.0),
        Vec3::new(10.0, y, 10.0),
        Vec3::new(10.0, y, 0.0),
    ];
    let mut mesh = NavMesh::new();
    mesh.build(&vertices, &SQUARE_TRIS, &[63, 63], &config())?;

    let path = mesh.query(Vec3::new(2.0, y, 2.0), Vec3::new(8.0, y, 7.0), &[]);
    assert!(!path.is_empty());
    for p in &path {
        assert!((p.y - y).abs() < 0.5, "waypoint height {}", p.y);
    }
    Ok(())
}

#[test]
fn test_path_around_hole() -> Result<()> {
    let polygon = Polygon::with_holes(&square_2d(0.0, 10.0), vec![square_2d(4.0, 6.0)]);
    assert!(!polygon.is_empty());

    let mut mesh = NavMesh::new();
    mesh.build_polygon(&polygon, 1, &config())?;

    let path = mesh.query_2d(Vec2::new(1.0, 5.0), Vec2::new(9.0, 5.0), &[]);
    assert!(path.len() >= 3, "path {:?}", path);
    for p in &path {
        let in_hole = p.x > 4.0 && p.x < 6.0 && p.y > 4.0 && p.y < 6.0;
        assert!(!in_hole, "waypoint {:?} inside the hole", p);
    }
    Ok(())
}

#[test]
fn test_out_of_range_area_costs_are_ignored() -> Result<()> {
    let mesh = flat_square()?;
    let start = Vec2::new(1.0, 1.0);
    let end = Vec2::new(9.0, 9.0);
    let plain = mesh.query_2d(start, end, &[]);
    let costed = mesh.query_2d(start, end, &[(200, 50.0), (64, 0.5)]);
    assert_eq!(plain, costed);
    Ok(())
}

#[test]
fn test_build_stats_and_drawing() -> Result<()> {
    let mesh = flat_square()?;
    let stats = mesh.last_build_stats().ok_or_else(|| {
        navgeom_common::Error::NavMeshGeneration("missing stats".to_string())
    })?;
    assert!(stats.polygons > 0);
    assert!(stats.detail_triangles >= stats.polygons);
    assert!(stats.timing(TimerCategory::Total).is_some());
    assert!(stats.timing(TimerCategory::Bake).is_some());

    let mut list = DrawList::new();
    mesh.draw_2d(&mut list, Color::GREEN);
    assert!(list.triangle_count() >= stats.detail_triangles);
    Ok(())
}

#[test]
fn test_release() -> Result<()> {
    let mut mesh = flat_square()?;
    mesh.release();
    assert!(!mesh.is_built());
    assert!(mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), &[]).is_empty());
    Ok(())
}

#[test]
fn test_concurrent_queries() -> Result<()> {
    let mesh = flat_square()?;
    let expected = mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), &[]);
    assert!(!expected.is_empty());

    let mesh = &mesh;
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(move || mesh.query_2d(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), &[])))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().ok(), Some(expected.clone()));
        }
    });
    Ok(())
}
