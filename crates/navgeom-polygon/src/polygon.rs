//! Polygon with holes and its triangulation

use navgeom_common::render::{Color, Renderer2D};
use navgeom_common::{point_in_ring, ring_centroid, ring_perimeter, RectF, Vec2};

use crate::buffer::JoinStyle;
use crate::kernel::{BuiltinKernel, PlanarKernel};
use crate::simplify::simplify_ring_by;
use crate::triangulate::triangulate;
use crate::validate::validate;

/// A simple polygon with optional holes.
///
/// Rings are open (no repeated closing point). Construction triangulates the
/// filled region once; only [`Polygon::move_by`] mutates a polygon after
/// that. A polygon built from invalid input is empty, and every operation on
/// an empty polygon returns zero or another empty polygon.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Polygon {
    outer: Vec<Vec2>,
    holes: Vec<Vec<Vec2>>,
    vertices: Vec<Vec2>,
    indices: Vec<[u32; 3]>,
    bounding_rect: RectF,
}

impl Polygon {
    /// The empty polygon
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a polygon without holes, validating the ring first
    pub fn new(outer: &[Vec2]) -> Self {
        Self::with_holes(outer, Vec::new())
    }

    /// Builds a polygon with holes, validating the rings first
    pub fn with_holes(outer: &[Vec2], holes: Vec<Vec<Vec2>>) -> Self {
        Self::build(outer, holes, true)
    }

    /// Builds a polygon from rings known to be valid
    pub fn with_holes_unchecked(outer: &[Vec2], holes: Vec<Vec<Vec2>>) -> Self {
        Self::build(outer, holes, false)
    }

    fn build(outer: &[Vec2], mut holes: Vec<Vec<Vec2>>, check: bool) -> Self {
        if outer.len() < 3 {
            return Self::empty();
        }

        if check {
            if let Err(failure) = validate(outer, &holes) {
                log::debug!("rejected polygon with {} points: {}", outer.len(), failure);
                return Self::empty();
            }
        }

        holes.retain(|h| h.len() >= 3);

        let triangulation = triangulate(outer, &holes);

        Self {
            outer: outer.to_vec(),
            holes,
            vertices: triangulation.vertices,
            indices: triangulation.indices,
            bounding_rect: RectF::from_points(outer),
        }
    }

    /// Builds a polygon from an outer ring and its precomputed triangulation.
    ///
    /// The vertex buffer is the outer ring itself. Nothing is validated.
    pub fn from_triangulation(outer: &[Vec2], indices: Vec<[u32; 3]>, bounding_rect: RectF) -> Self {
        if outer.len() < 3 {
            return Self::empty();
        }

        Self {
            outer: outer.to_vec(),
            holes: Vec::new(),
            vertices: outer.to_vec(),
            indices,
            bounding_rect,
        }
    }

    /// Builds a polygon from rings plus a precomputed vertex and index buffer.
    ///
    /// Nothing is validated; holes with fewer than 3 points are dropped.
    pub fn from_parts(
        outer: &[Vec2],
        mut holes: Vec<Vec<Vec2>>,
        vertices: Vec<Vec2>,
        indices: Vec<[u32; 3]>,
        bounding_rect: RectF,
    ) -> Self {
        if outer.len() < 3 {
            return Self::empty();
        }

        holes.retain(|h| h.len() >= 3);

        Self {
            outer: outer.to_vec(),
            holes,
            vertices,
            indices,
            bounding_rect,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outer.is_empty()
    }

    pub fn outer(&self) -> &[Vec2] {
        &self.outer
    }

    pub fn holes(&self) -> &[Vec<Vec2>] {
        &self.holes
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn bounding_rect(&self) -> RectF {
        self.bounding_rect
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// Corners of the `index`-th triangle
    pub fn triangle(&self, index: usize) -> Option<[Vec2; 3]> {
        let [a, b, c] = *self.indices.get(index)?;
        Some([
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ])
    }

    /// Area of the filled region, summed over the triangulation
    pub fn area(&self) -> f64 {
        (0..self.indices.len())
            .filter_map(|i| self.triangle(i))
            .map(|[a, b, c]| ((b - a).perp_dot(c - a) * 0.5).abs())
            .sum()
    }

    /// Length of the outer ring plus every hole, each closed
    pub fn perimeter(&self) -> f64 {
        ring_perimeter(&self.outer) + self.holes.iter().map(|h| ring_perimeter(h)).sum::<f64>()
    }

    /// Area-weighted centroid of the filled region; the origin when empty
    pub fn centroid(&self) -> Vec2 {
        if self.is_empty() {
            return Vec2::ZERO;
        }

        let (outer_c, outer_a) = ring_centroid(&self.outer);
        let mut weighted = outer_c * outer_a.abs();
        let mut total = outer_a.abs();

        for hole in &self.holes {
            let (c, a) = ring_centroid(hole);
            weighted -= c * a.abs();
            total -= a.abs();
        }

        if total.abs() <= f64::EPSILON {
            return outer_c;
        }
        weighted / total
    }

    /// Returns true if the point is inside the outer ring and outside all holes
    pub fn contains(&self, p: Vec2) -> bool {
        if self.is_empty() || !self.bounding_rect.contains(p) {
            return false;
        }
        point_in_ring(p, &self.outer) && !self.holes.iter().any(|h| point_in_ring(p, h))
    }

    /// Convex hull of the outer ring
    pub fn calculate_convex_hull(&self) -> Polygon {
        self.calculate_convex_hull_with(&BuiltinKernel)
    }

    pub fn calculate_convex_hull_with<K: PlanarKernel + ?Sized>(&self, kernel: &K) -> Polygon {
        if self.is_empty() {
            return Self::empty();
        }
        Self::new(&kernel.convex_hull(&self.outer))
    }

    /// Offsets the polygon with miter joins, outward for positive distances
    pub fn calculate_buffer(&self, distance: f64) -> Polygon {
        self.calculate_buffer_with(&BuiltinKernel, distance, JoinStyle::Miter)
    }

    /// Offsets the polygon with round joins, outward for positive distances
    pub fn calculate_round_buffer(&self, distance: f64) -> Polygon {
        self.calculate_buffer_with(&BuiltinKernel, distance, JoinStyle::Round)
    }

    pub fn calculate_buffer_with<K: PlanarKernel + ?Sized>(
        &self,
        kernel: &K,
        distance: f64,
        join: JoinStyle,
    ) -> Polygon {
        if self.is_empty() {
            return Self::empty();
        }

        match kernel.buffer(&self.outer, &self.holes, distance, join) {
            Some(rings) => Self::with_holes(&rings.outer, rings.holes),
            None => Self::empty(),
        }
    }

    /// Douglas-Peucker simplification of every ring
    pub fn simplified(&self, max_distance: f64) -> Polygon {
        self.simplified_with(&BuiltinKernel, max_distance)
    }

    pub fn simplified_with<K: PlanarKernel + ?Sized>(&self, kernel: &K, max_distance: f64) -> Polygon {
        if self.is_empty() {
            return Self::empty();
        }

        let simplify = |ring: &[Vec2]| simplify_ring_by(ring, |closed| kernel.simplify(closed, max_distance));

        let outer = simplify(&self.outer);
        let holes = self
            .holes
            .iter()
            .map(|h| simplify(h))
            .filter(|h| h.len() >= 3 && h.first() != h.last())
            .collect();

        Self::with_holes(&outer, holes)
    }

    /// Translates the polygon in place
    pub fn move_by(&mut self, v: Vec2) -> &mut Self {
        if self.is_empty() {
            return self;
        }

        for p in self
            .outer
            .iter_mut()
            .chain(self.holes.iter_mut().flatten())
            .chain(self.vertices.iter_mut())
        {
            *p += v;
        }
        self.bounding_rect.move_by(v);
        self
    }

    /// Translated copy of the polygon
    pub fn moved_by(&self, v: Vec2) -> Polygon {
        let mut moved = self.clone();
        moved.move_by(v);
        moved
    }

    /// Hands the triangulation to a renderer for filling
    pub fn draw<R: Renderer2D + ?Sized>(&self, renderer: &mut R, color: Color) {
        if self.is_empty() {
            return;
        }
        renderer.fill_triangles(&self.vertices, &self.indices, color);
    }

    /// Hands every ring to a renderer as a closed outline
    pub fn draw_frame<R: Renderer2D + ?Sized>(&self, renderer: &mut R, thickness: f64, color: Color) {
        if self.is_empty() {
            return;
        }
        renderer.stroke_closed(&self.outer, thickness, color);
        for hole in &self.holes {
            renderer.stroke_closed(hole, thickness, color);
        }
    }
}
