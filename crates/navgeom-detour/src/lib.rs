//! Detour component: baked navigation graph and path queries
//!
//! A [`NavMesh`] is baked from the polygon and detail meshes produced by
//! `navgeom-recast`. [`NavMeshQuery`] answers nearest polygon, corridor and
//! straight path queries against it. The mesh is read only once baked, so
//! any number of queries may run against it from several threads, each with
//! its own `NavMeshQuery`.

use bitflags::bitflags;

mod bv_tree;
mod nav_mesh;
mod nav_mesh_query;
mod node_pool;
mod status;
#[cfg(test)]
mod test_mesh_helpers;

pub use bv_tree::{BVNode, BVTree, QuantBounds};
pub use nav_mesh::{Link, NavMesh, Poly, PolyDetail};
pub use nav_mesh_query::NavMeshQuery;
pub use node_pool::{Node, NodeFlags, NodeIndex, NodePool, DT_NULL_IDX};
pub use status::{Result, Status};

/// Maximum number of vertices per navigation polygon
pub const MAX_VERTS_PER_POLY: usize = 6;

/// Number of distinct area ids a filter can weigh
pub const DT_MAX_AREAS: usize = 64;

/// Default size of the search node pool
pub const DT_DEFAULT_MAX_NODES: usize = 2048;

const POLY_BITS: u32 = 16;
const POLY_MASK: u32 = (1 << POLY_BITS) - 1;

/// Reference to a polygon of a baked mesh
///
/// The high 16 bits hold the salt of the bake the polygon belongs to and
/// the low 16 bits its index. A zero salt never occurs, so `PolyRef(0)` is
/// the null reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PolyRef(u32);

impl PolyRef {
    pub const NULL: PolyRef = PolyRef(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn encode(salt: u16, index: usize) -> Self {
        Self(((salt as u32) << POLY_BITS) | (index as u32 & POLY_MASK))
    }

    pub fn id(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    pub fn salt(&self) -> u16 {
        (self.0 >> POLY_BITS) as u16
    }

    pub fn index(&self) -> usize {
        (self.0 & POLY_MASK) as usize
    }
}

impl std::fmt::Display for PolyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.salt(), self.index())
    }
}

bitflags! {
    /// Polygon flags consulted by [`QueryFilter`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(
        feature = "serialization",
        derive(serde::Serialize, serde::Deserialize)
    )]
    pub struct PolyFlags: u16 {
        /// Walkable ground
        const WALK = 0x01;
        const SWIM = 0x02;
        const DOOR = 0x04;
        const JUMP = 0x08;
        /// Excluded from every search
        const DISABLED = 0x10;
        const ALL = 0xffff;
    }
}

bitflags! {
    /// Role of a vertex in a straight path
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(
        feature = "serialization",
        derive(serde::Serialize, serde::Deserialize)
    )]
    pub struct StraightPathFlags: u8 {
        const START = 0x01;
        const END = 0x02;
    }
}

/// Decides which polygons a search may enter and what crossing them costs
#[derive(Debug, Clone)]
pub struct QueryFilter {
    /// Cost multiplier per area id
    pub area_cost: [f32; DT_MAX_AREAS],
    /// A polygon must share at least one flag with this mask
    pub include_flags: PolyFlags,
    /// A polygon must share no flag with this mask
    pub exclude_flags: PolyFlags,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            area_cost: [1.0; DT_MAX_AREAS],
            include_flags: PolyFlags::ALL,
            exclude_flags: PolyFlags::empty(),
        }
    }
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the traversal cost of `area`; ids outside the table are ignored
    pub fn set_area_cost(&mut self, area: u8, cost: f32) {
        if let Some(slot) = self.area_cost.get_mut(area as usize) {
            *slot = cost;
        }
    }

    pub fn area_cost(&self, area: u8) -> f32 {
        self.area_cost.get(area as usize).copied().unwrap_or(1.0)
    }

    pub fn pass_filter(&self, poly: &Poly) -> bool {
        poly.flags.intersects(self.include_flags) && !poly.flags.intersects(self.exclude_flags)
    }

    /// Cost of moving from `pa` to `pb` inside a polygon of area `area`
    pub fn get_cost(&self, pa: glam::Vec3, pb: glam::Vec3, area: u8) -> f32 {
        pa.distance(pb) * self.area_cost(area)
    }
}

/// Straightened path with the polygons it was derived from
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Path {
    pub waypoints: Vec<glam::Vec3>,
    pub flags: Vec<StraightPathFlags>,
    /// Polygon entered at each waypoint
    pub poly_refs: Vec<PolyRef>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Sum of the segment lengths
    pub fn length(&self) -> f32 {
        self.waypoints.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poly_ref_encoding() {
        let r = PolyRef::encode(7, 1234);
        assert_eq!(r.salt(), 7);
        assert_eq!(r.index(), 1234);
        assert!(r.is_valid());
        assert!(!PolyRef::NULL.is_valid());
        assert_eq!(r.to_string(), "7:1234");
    }

    #[test]
    fn test_filter_costs() {
        let mut filter = QueryFilter::new();
        filter.set_area_cost(3, 4.0);
        filter.set_area_cost(200, 9.0);
        assert_eq!(filter.area_cost(3), 4.0);
        assert_eq!(filter.area_cost(4), 1.0);
        assert_eq!(filter.area_cost(200), 1.0);

        let a = glam::Vec3::ZERO;
        let b = glam::Vec3::new(3.0, 0.0, 4.0);
        assert!((filter.get_cost(a, b, 3) - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_filter_flags() {
        let mut poly = Poly::default();
        poly.flags = PolyFlags::WALK;

        let mut filter = QueryFilter::new();
        assert!(filter.pass_filter(&poly));

        filter.exclude_flags = PolyFlags::WALK;
        assert!(!filter.pass_filter(&poly));

        filter.exclude_flags = PolyFlags::empty();
        filter.include_flags = PolyFlags::SWIM;
        assert!(!filter.pass_filter(&poly));

        poly.flags = PolyFlags::empty();
        filter.include_flags = PolyFlags::ALL;
        assert!(!filter.pass_filter(&poly));
    }

    #[test]
    fn test_path_length() {
        let path = Path {
            waypoints: vec![
                glam::Vec3::ZERO,
                glam::Vec3::new(3.0, 0.0, 4.0),
                glam::Vec3::new(3.0, 0.0, 5.0),
            ],
            ..Default::default()
        };
        assert_eq!(path.len(), 3);
        assert!((path.length() - 6.0).abs() < 1e-5);
    }
}
