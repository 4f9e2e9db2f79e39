//! Search node pool for pathfinding
//!
//! Nodes live in a fixed capacity array and are found again through a hash
//! of their polygon reference. Parents are stored as indices.

use glam::Vec3;

use super::PolyRef;

/// Node flags for pathfinding state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeFlags(u8);

impl NodeFlags {
    pub const OPEN: NodeFlags = NodeFlags(0x01);
    pub const CLOSED: NodeFlags = NodeFlags(0x02);

    pub fn contains(&self, flag: NodeFlags) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn insert(&mut self, flag: NodeFlags) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: NodeFlags) {
        self.0 &= !flag.0;
    }
}

/// Node index type
pub type NodeIndex = u16;

/// Null node index constant
pub const DT_NULL_IDX: NodeIndex = NodeIndex::MAX;

/// Node in the pathfinding graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Point where the search entered the polygon
    pub pos: Vec3,
    /// Cost from the start to this node
    pub cost: f32,
    /// Cost plus heuristic
    pub total: f32,
    /// Index of the parent node, `DT_NULL_IDX` for the start
    pub pidx: NodeIndex,
    pub flags: NodeFlags,
    pub id: PolyRef,
}

impl Node {
    fn new(id: PolyRef) -> Self {
        Self {
            pos: Vec3::ZERO,
            cost: 0.0,
            total: 0.0,
            pidx: DT_NULL_IDX,
            flags: NodeFlags::default(),
            id,
        }
    }
}

/// Fixed capacity node storage with a polygon ref hash
#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<Node>,
    /// First node index for each hash bucket
    first: Vec<NodeIndex>,
    /// Next node index in hash chain
    next: Vec<NodeIndex>,
    max_nodes: usize,
    hash_mask: usize,
}

impl NodePool {
    /// Creates a pool holding at most `max_nodes` nodes.
    ///
    /// The hash table size is the next power of two of a quarter of the
    /// capacity.
    pub fn new(max_nodes: usize) -> Self {
        let max_nodes = max_nodes.clamp(1, DT_NULL_IDX as usize - 1);
        let hash_size = (max_nodes / 4).max(1).next_power_of_two();
        Self {
            nodes: Vec::with_capacity(max_nodes),
            first: vec![DT_NULL_IDX; hash_size],
            next: vec![DT_NULL_IDX; max_nodes],
            max_nodes,
            hash_mask: hash_size - 1,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.first.fill(DT_NULL_IDX);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    fn hash_ref(id: PolyRef) -> usize {
        let mut a = id.id();
        a = a.wrapping_add(!(a << 15));
        a ^= a >> 10;
        a = a.wrapping_add(a << 3);
        a ^= a >> 6;
        a = a.wrapping_add(!(a << 11));
        a ^= a >> 16;
        a as usize
    }

    /// Index of the node for `id`, allocating one if needed.
    ///
    /// Returns `None` when the pool is full.
    pub fn get_node(&mut self, id: PolyRef) -> Option<NodeIndex> {
        if let Some(idx) = self.find_node(id) {
            return Some(idx);
        }

        if self.nodes.len() >= self.max_nodes {
            return None;
        }

        let idx = self.nodes.len();
        self.nodes.push(Node::new(id));

        let bucket = Self::hash_ref(id) & self.hash_mask;
        self.next[idx] = self.first[bucket];
        self.first[bucket] = idx as NodeIndex;

        Some(idx as NodeIndex)
    }

    pub fn find_node(&self, id: PolyRef) -> Option<NodeIndex> {
        let mut idx = self.first[Self::hash_ref(id) & self.hash_mask];
        while idx != DT_NULL_IDX {
            if self.nodes[idx as usize].id == id {
                return Some(idx);
            }
            idx = self.next[idx as usize];
        }
        None
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx as usize]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.nodes[idx as usize]
    }

    /// Polygon refs from the start node to `idx`
    pub fn path_to(&self, idx: NodeIndex) -> Vec<PolyRef> {
        let mut path = Vec::new();
        let mut cur = idx;
        while cur != DT_NULL_IDX {
            let node = self.node(cur);
            path.push(node.id);
            cur = node.pidx;
        }
        path.reverse();
        path
    }
}
