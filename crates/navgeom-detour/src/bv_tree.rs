//! Quantized bounding volume tree over the polygons of a baked mesh
//!
//! Nodes are stored depth first in a flat array. A leaf stores the polygon
//! index in `i`; an internal node stores the negated escape offset, the number
//! of nodes to skip when its bounds do not overlap the query.

use glam::Vec3;

/// Bounds quantized to the mesh grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct QuantBounds {
    pub bmin: [u16; 3],
    pub bmax: [u16; 3],
}

impl QuantBounds {
    pub fn overlaps(&self, other: &QuantBounds) -> bool {
        (0..3).all(|k| self.bmin[k] <= other.bmax[k] && self.bmax[k] >= other.bmin[k])
    }

    fn extend(&mut self, other: &QuantBounds) {
        for k in 0..3 {
            self.bmin[k] = self.bmin[k].min(other.bmin[k]);
            self.bmax[k] = self.bmax[k].max(other.bmax[k]);
        }
    }

    fn longest_axis(&self) -> usize {
        let extent = |k: usize| self.bmax[k].saturating_sub(self.bmin[k]);
        let mut axis = 0;
        if extent(1) > extent(axis) {
            axis = 1;
        }
        if extent(2) > extent(axis) {
            axis = 2;
        }
        axis
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BVNode {
    pub bounds: QuantBounds,
    /// Polygon index for leaves, negated escape offset otherwise
    pub i: i32,
}

impl BVNode {
    pub fn is_leaf(&self) -> bool {
        self.i >= 0
    }
}

/// Flat bounding volume tree with its quantization frame
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BVTree {
    nodes: Vec<BVNode>,
    origin: Vec3,
    extent: Vec3,
    quant_factor: f32,
}

impl BVTree {
    /// Builds the tree from one world space box per polygon.
    ///
    /// `origin..origin + extent` is the quantization frame and
    /// `quant_factor` the number of quantization steps per world unit.
    pub fn build(boxes: &[(Vec3, Vec3)], origin: Vec3, extent: Vec3, quant_factor: f32) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(boxes.len() * 2),
            origin,
            extent,
            quant_factor,
        };

        let mut items: Vec<(usize, QuantBounds)> = boxes
            .iter()
            .enumerate()
            .map(|(i, &(bmin, bmax))| (i, tree.quantize_item(bmin, bmax)))
            .collect();

        if !items.is_empty() {
            tree.subdivide(&mut items);
        }
        tree
    }

    pub fn nodes(&self) -> &[BVNode] {
        &self.nodes
    }

    pub fn quant_factor(&self) -> f32 {
        self.quant_factor
    }

    /// Item bounds round outward to whole steps
    fn quantize_item(&self, bmin: Vec3, bmax: Vec3) -> QuantBounds {
        let q = |v: f32| v.clamp(0.0, 65535.0);
        let lo = (bmin - self.origin) * self.quant_factor;
        let hi = (bmax - self.origin) * self.quant_factor;
        QuantBounds {
            bmin: [q(lo.x.floor()) as u16, q(lo.y.floor()) as u16, q(lo.z.floor()) as u16],
            bmax: [q(hi.x.ceil()) as u16, q(hi.y.ceil()) as u16, q(hi.z.ceil()) as u16],
        }
    }

    /// Query bounds clamp to the frame; min rounds to even and max to odd
    /// so that boxes touching along a step boundary still overlap.
    fn quantize_query(&self, bmin: Vec3, bmax: Vec3) -> QuantBounds {
        let lo = (bmin.clamp(self.origin, self.origin + self.extent) - self.origin) * self.quant_factor;
        let hi = (bmax.clamp(self.origin, self.origin + self.extent) - self.origin) * self.quant_factor;
        let q = |v: f32| v.clamp(0.0, 65535.0) as u16;
        QuantBounds {
            bmin: [q(lo.x) & 0xfffe, q(lo.y) & 0xfffe, q(lo.z) & 0xfffe],
            bmax: [q(hi.x + 1.0) | 1, q(hi.y + 1.0) | 1, q(hi.z + 1.0) | 1],
        }
    }

    fn subdivide(&mut self, items: &mut [(usize, QuantBounds)]) {
        let node_index = self.nodes.len();

        if let [(poly, bounds)] = items {
            self.nodes.push(BVNode {
                bounds: *bounds,
                i: *poly as i32,
            });
            return;
        }

        let mut bounds = items[0].1;
        for (_, b) in items.iter().skip(1) {
            bounds.extend(b);
        }
        self.nodes.push(BVNode { bounds, i: 0 });

        let axis = bounds.longest_axis();
        items.sort_by_key(|(_, b)| b.bmin[axis]);

        let split = items.len() / 2;
        let (left, right) = items.split_at_mut(split);
        self.subdivide(left);
        self.subdivide(right);

        let escape = (self.nodes.len() - node_index) as i32;
        self.nodes[node_index].i = -escape;
    }

    /// Indices of the polygons whose boxes overlap `bmin..bmax`
    pub fn query(&self, bmin: Vec3, bmax: Vec3) -> Vec<usize> {
        let mut result = Vec::new();
        if bmin.cmpgt(self.origin + self.extent).any() || bmax.cmplt(self.origin).any() {
            return result;
        }

        let qbounds = self.quantize_query(bmin, bmax);
        let mut cur = 0;
        while cur < self.nodes.len() {
            let node = &self.nodes[cur];
            let overlap = qbounds.overlaps(&node.bounds);

            if node.is_leaf() && overlap {
                result.push(node.i as usize);
            }

            if overlap || node.is_leaf() {
                cur += 1;
            } else {
                cur += (-node.i) as usize;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_boxes(n: usize) -> Vec<(Vec3, Vec3)> {
        let mut boxes = Vec::new();
        for z in 0..n {
            for x in 0..n {
                let bmin = Vec3::new(x as f32, 0.0, z as f32);
                boxes.push((bmin, bmin + Vec3::new(1.0, 0.5, 1.0)));
            }
        }
        boxes
    }

    #[test]
    fn test_single_leaf() {
        let tree = BVTree::build(&grid_boxes(1), Vec3::ZERO, Vec3::ONE, 4.0);
        assert_eq!(tree.nodes().len(), 1);
        assert!(tree.nodes()[0].is_leaf());
        assert_eq!(tree.query(Vec3::splat(0.2), Vec3::splat(0.4)), vec![0]);
    }

    #[test]
    fn test_node_count_and_escape() {
        let boxes = grid_boxes(4);
        let tree = BVTree::build(&boxes, Vec3::ZERO, Vec3::new(4.0, 0.5, 4.0), 4.0);

        // a binary tree over n leaves has 2n - 1 nodes
        assert_eq!(tree.nodes().len(), 2 * boxes.len() - 1);
        assert_eq!(-tree.nodes()[0].i as usize, tree.nodes().len());
    }

    #[test]
    fn test_query_matches_brute_force() {
        let boxes = grid_boxes(6);
        let tree = BVTree::build(&boxes, Vec3::ZERO, Vec3::new(6.0, 0.5, 6.0), 8.0);

        let qmin = Vec3::new(2.2, -1.0, 3.1);
        let qmax = Vec3::new(3.6, 1.0, 3.4);
        let mut found = tree.query(qmin, qmax);
        found.sort_unstable();

        // every box that really overlaps is reported
        for (i, &(bmin, bmax)) in boxes.iter().enumerate() {
            let overlaps = bmin.cmple(qmax).all() && bmax.cmpge(qmin).all();
            if overlaps {
                assert!(found.contains(&i), "missing box {}", i);
            }
        }
        // quantization only ever adds neighbors of the query box
        assert!(found.len() <= 9);
    }

    #[test]
    fn test_query_outside_frame() {
        let tree = BVTree::build(&grid_boxes(3), Vec3::ZERO, Vec3::new(3.0, 0.5, 3.0), 4.0);
        assert!(tree.query(Vec3::splat(10.0), Vec3::splat(11.0)).is_empty());
        assert!(tree.query(Vec3::splat(-5.0), Vec3::splat(-4.0)).is_empty());
    }
}
