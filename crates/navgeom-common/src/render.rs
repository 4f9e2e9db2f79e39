//! Renderer-agnostic hand-off of shapes for drawing
//!
//! The geometry crates never rasterize anything themselves. Filled shapes are
//! handed over as a vertex buffer plus index triples, outlines as closed
//! point loops. [`DrawList`] records these calls so that callers (and tests)
//! can inspect or replay them.

use crate::Vec2;

/// RGBA color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Creates a new color
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from RGB values (alpha = 1.0)
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Creates a color from RGBA bytes
    pub const fn from_rgba_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const ORANGE: Color = Color::rgb(1.0, 0.5, 0.0);
}

/// Consumer of drawable geometry
pub trait Renderer2D {
    /// Fills the triangles `indices` over `vertices`
    fn fill_triangles(&mut self, vertices: &[Vec2], indices: &[[u32; 3]], color: Color);

    /// Strokes a closed loop through `points`
    fn stroke_closed(&mut self, points: &[Vec2], thickness: f64, color: Color);
}

/// A single recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill {
        vertices: Vec<Vec2>,
        indices: Vec<[u32; 3]>,
        color: Color,
    },
    ClosedLine {
        points: Vec<Vec2>,
        thickness: f64,
        color: Color,
    },
}

/// Renderer that records every call it receives
#[derive(Debug, Default, Clone)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Total number of filled triangles recorded so far
    pub fn triangle_count(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                DrawCommand::Fill { indices, .. } => indices.len(),
                DrawCommand::ClosedLine { .. } => 0,
            })
            .sum()
    }
}

impl Renderer2D for DrawList {
    fn fill_triangles(&mut self, vertices: &[Vec2], indices: &[[u32; 3]], color: Color) {
        if indices.is_empty() {
            return;
        }
        self.commands.push(DrawCommand::Fill {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
            color,
        });
    }

    fn stroke_closed(&mut self, points: &[Vec2], thickness: f64, color: Color) {
        if points.len() < 2 {
            return;
        }
        self.commands.push(DrawCommand::ClosedLine {
            points: points.to_vec(),
            thickness,
            color,
        });
    }
}
