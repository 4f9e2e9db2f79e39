//! Geometric properties that must hold for any valid polygon

use approx::assert_relative_eq;
use navgeom_common::render::{Color, DrawCommand, DrawList};
use navgeom_common::{ring_area, ring_perimeter};
use navgeom_polygon::{
    BufferedRings, BuiltinKernel, JoinStyle, PlanarKernel, Polygon, RectF, Vec2,
};

fn pts(coords: &[(f64, f64)]) -> Vec<Vec2> {
    coords.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
}

fn shapes() -> Vec<Vec<Vec2>> {
    vec![
        pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
        pts(&[(0.0, 0.0), (6.0, 0.0), (6.0, 2.0), (2.0, 2.0), (2.0, 6.0), (0.0, 6.0)]),
        pts(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 5.0),
            (5.0, 5.0),
            (5.0, 0.0),
            (8.0, 0.0),
            (8.0, 8.0),
            (0.0, 8.0),
        ]),
        // star, reversed winding
        (0..10)
            .rev()
            .map(|i| {
                let a = i as f64 * std::f64::consts::PI / 5.0;
                let r = if i % 2 == 0 { 5.0 } else { 2.0 };
                Vec2::new(r * a.cos(), r * a.sin())
            })
            .collect(),
    ]
}

#[test]
fn test_triangulated_area_matches_shoelace() {
    for outer in shapes() {
        let p = Polygon::new(&outer);
        assert!(!p.is_empty());
        assert_relative_eq!(p.area(), ring_area(&outer), epsilon = 1e-9);
        assert_eq!(p.num_triangles(), outer.len() - 2);
    }
}

#[test]
fn test_indices_stay_in_bounds() {
    let outer = pts(&[(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)]);
    let holes = vec![
        pts(&[(2.0, 2.0), (6.0, 2.0), (6.0, 6.0), (2.0, 6.0)]),
        pts(&[(10.0, 10.0), (15.0, 12.0), (12.0, 16.0)]),
    ];
    let p = Polygon::with_holes(&outer, holes.clone());

    for tri in p.indices() {
        assert!(tri.iter().all(|&i| (i as usize) < p.vertices().len()));
    }
    assert_eq!(&p.vertices()[..outer.len()], outer.as_slice());

    let expected = ring_area(&outer) - holes.iter().map(|h| ring_area(h)).sum::<f64>();
    assert_relative_eq!(p.area(), expected, epsilon = 1e-9);
}

#[test]
fn test_perimeter_is_cyclic_sum() {
    for outer in shapes() {
        let p = Polygon::new(&outer);
        let manual: f64 = (0..outer.len())
            .map(|i| outer[i].distance(outer[(i + 1) % outer.len()]))
            .sum();
        assert_relative_eq!(p.perimeter(), manual, epsilon = 1e-9);
        assert_relative_eq!(p.perimeter(), ring_perimeter(&outer), epsilon = 1e-9);
    }
}

#[test]
fn test_move_by_is_translation() {
    let v = Vec2::new(-7.5, 12.25);
    for outer in shapes() {
        let p = Polygon::new(&outer);
        let moved = p.moved_by(v);

        assert_relative_eq!(moved.area(), p.area(), epsilon = 1e-9);
        assert_relative_eq!(moved.perimeter(), p.perimeter(), epsilon = 1e-9);

        let (a, b) = (p.bounding_rect(), moved.bounding_rect());
        assert_relative_eq!(b.pos.x, a.pos.x + v.x, epsilon = 1e-12);
        assert_relative_eq!(b.pos.y, a.pos.y + v.y, epsilon = 1e-12);
        assert_eq!(b.size, a.size);
        assert_eq!(moved.indices(), p.indices());
    }

    let mut empty = Polygon::empty();
    empty.move_by(v);
    assert!(empty.is_empty());
    assert_eq!(empty.bounding_rect(), RectF::default());
}

#[test]
fn test_hull_of_convex_ring_keeps_vertex_set() {
    let hexagon: Vec<Vec2> = (0..6)
        .map(|i| {
            let a = i as f64 * std::f64::consts::PI / 3.0;
            Vec2::new(4.0 * a.cos(), 4.0 * a.sin())
        })
        .collect();

    let p = Polygon::new(&hexagon);
    let hull = p.calculate_convex_hull();

    assert_eq!(hull.outer().len(), hexagon.len());
    for v in &hexagon {
        assert!(hull.outer().iter().any(|h| h.distance(*v) < 1e-12));
    }
    assert_relative_eq!(hull.area(), p.area(), epsilon = 1e-9);
}

#[test]
fn test_simplified_zero_preserves_area() {
    for outer in shapes() {
        let p = Polygon::new(&outer);
        let s = p.simplified(0.0);
        assert!(s.outer().len() >= 3);
        assert_relative_eq!(s.area(), p.area(), epsilon = 1e-9);
    }

    let p = Polygon::with_holes(
        &pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
        vec![pts(&[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)])],
    );
    let s = p.simplified(0.0);
    assert_eq!(s.holes().len(), 1);
    assert_relative_eq!(s.area(), 96.0, epsilon = 1e-9);
}

#[test]
fn test_large_tolerance_never_goes_below_three_points() {
    let p = Polygon::new(&pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 1.0), (0.0, 1.0)]));
    let s = p.simplified(100.0);
    assert!(s.is_empty() || s.outer().len() >= 3);
}

#[test]
fn test_buffer_round_trip_area_bounds() {
    let p = Polygon::new(&pts(&[(0.0, 0.0), (6.0, 0.0), (6.0, 2.0), (2.0, 2.0), (2.0, 6.0), (0.0, 6.0)]));

    let grown = p.calculate_buffer(0.5);
    let round = p.calculate_round_buffer(0.5);
    let shrunk = p.calculate_buffer(-0.25);

    assert!(grown.area() > p.area());
    assert!(round.area() > p.area() && round.area() < grown.area());
    assert!(shrunk.area() < p.area() && !shrunk.is_empty());

    // a 2-wide arm vanishes when eroded by more than 1
    assert!(p.calculate_buffer(-1.5).is_empty());
}

/// Kernel that refuses to offset anything
struct NoBufferKernel;

impl PlanarKernel for NoBufferKernel {
    fn convex_hull(&self, points: &[Vec2]) -> Vec<Vec2> {
        BuiltinKernel.convex_hull(points)
    }

    fn buffer(&self, _: &[Vec2], _: &[Vec<Vec2>], _: f64, _: JoinStyle) -> Option<BufferedRings> {
        None
    }

    fn simplify(&self, polyline: &[Vec2], _: f64) -> Vec<Vec2> {
        polyline.to_vec()
    }
}

#[test]
fn test_custom_kernel() {
    let p = Polygon::new(&shapes()[0]);
    assert!(p.calculate_buffer_with(&NoBufferKernel, 1.0, JoinStyle::Miter).is_empty());
    assert_eq!(p.simplified_with(&NoBufferKernel, 5.0).outer(), p.outer());
    assert_relative_eq!(p.calculate_convex_hull_with(&NoBufferKernel).area(), 100.0);
}

#[test]
fn test_draw_consumes_triangulation_and_rings() {
    let p = Polygon::new(&shapes()[1]);
    let mut list = DrawList::new();
    p.draw(&mut list, Color::WHITE);
    p.draw_frame(&mut list, 1.0, Color::RED);

    match list.commands() {
        [DrawCommand::Fill { vertices, indices, .. }, DrawCommand::ClosedLine { points, .. }] => {
            assert_eq!(vertices.as_slice(), p.vertices());
            assert_eq!(indices.as_slice(), p.indices());
            assert_eq!(points.as_slice(), p.outer());
        }
        other => panic!("unexpected draw calls: {other:?}"),
    }

    let mut list = DrawList::new();
    Polygon::empty().draw(&mut list, Color::WHITE);
    assert!(list.is_empty());
}
