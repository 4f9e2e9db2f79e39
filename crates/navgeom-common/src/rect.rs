//! Axis-aligned bounding rectangle in polygon space

use crate::Vec2;

/// Axis-aligned rectangle given by its top-left corner and size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RectF {
    pub pos: Vec2,
    pub size: Vec2,
}

impl RectF {
    pub const fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    /// Smallest rectangle covering every point, or an empty rectangle at the
    /// origin when there are no points.
    pub fn from_points(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));

        Self {
            pos: min,
            size: max - min,
        }
    }

    pub fn min(&self) -> Vec2 {
        self.pos
    }

    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn area(&self) -> f64 {
        self.size.x * self.size.y
    }

    /// Returns true if the point lies inside or on the border
    pub fn contains(&self, p: Vec2) -> bool {
        let max = self.max();
        p.x >= self.pos.x && p.y >= self.pos.y && p.x <= max.x && p.y <= max.y
    }

    pub fn intersects(&self, other: &RectF) -> bool {
        let (amax, bmax) = (self.max(), other.max());
        self.pos.x <= bmax.x && amax.x >= other.pos.x && self.pos.y <= bmax.y && amax.y >= other.pos.y
    }

    /// Translates the rectangle in place
    pub fn move_by(&mut self, v: Vec2) {
        self.pos += v;
    }

    pub fn moved_by(&self, v: Vec2) -> Self {
        Self::new(self.pos + v, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let rect = RectF::from_points(&[
            Vec2::new(1.0, 5.0),
            Vec2::new(-2.0, 3.0),
            Vec2::new(4.0, -1.0),
        ]);
        assert_eq!(rect.min(), Vec2::new(-2.0, -1.0));
        assert_eq!(rect.max(), Vec2::new(4.0, 5.0));
        assert_eq!(rect.area(), 36.0);
    }

    #[test]
    fn test_empty_points() {
        assert_eq!(RectF::from_points(&[]), RectF::default());
    }

    #[test]
    fn test_move_by() {
        let mut rect = RectF::new(Vec2::new(1.0, 1.0), Vec2::new(2.0, 3.0));
        rect.move_by(Vec2::new(-1.0, 2.0));
        assert_eq!(rect.pos, Vec2::new(0.0, 3.0));
        assert_eq!(rect.size, Vec2::new(2.0, 3.0));
        assert!(rect.contains(Vec2::new(1.0, 4.0)));
        assert!(!rect.contains(Vec2::new(3.0, 4.0)));
    }
}
