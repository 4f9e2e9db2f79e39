//! Ear clipping triangulation of a polygon with holes
//!
//! Holes are bridged into the outer ring, the resulting single ring is then
//! clipped ear by ear. When no ear can be found the ring is cleaned up, then
//! locally self-intersecting spots are cut, then the ring is split along a
//! valid diagonal and both halves are processed again.
//!
//! No Steiner points are introduced, so the vertex buffer is the outer ring
//! followed by every hole ring, in order.

use navgeom_common::{ring_signed_area, Vec2};

/// Vertex buffer plus index triples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triangulation {
    pub vertices: Vec<Vec2>,
    pub indices: Vec<[u32; 3]>,
}

impl Triangulation {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sum of unsigned triangle areas
    pub fn area(&self) -> f64 {
        self.indices
            .iter()
            .map(|&[a, b, c]| {
                let (a, b, c) = (
                    self.vertices[a as usize],
                    self.vertices[b as usize],
                    self.vertices[c as usize],
                );
                ((b - a).perp_dot(c - a) * 0.5).abs()
            })
            .sum()
    }
}

/// Triangulates `outer` minus `holes`.
///
/// Returns an empty index list for degenerate input (fewer than three outer
/// points, zero area, non-finite coordinates).
pub fn triangulate(outer: &[Vec2], holes: &[Vec<Vec2>]) -> Triangulation {
    let mut vertices = Vec::with_capacity(outer.len() + holes.iter().map(Vec::len).sum::<usize>());
    vertices.extend_from_slice(outer);
    let mut hole_ranges = Vec::with_capacity(holes.len());
    for hole in holes {
        let start = vertices.len();
        vertices.extend_from_slice(hole);
        hole_ranges.push(start..vertices.len());
    }

    let mut result = Triangulation {
        vertices,
        indices: Vec::new(),
    };

    if outer.len() < 3 || result.vertices.iter().any(|v| !v.is_finite()) {
        return result;
    }

    let mut earcut = Earcut::with_capacity(result.vertices.len() * 3 / 2);
    let Some(mut outer_node) = earcut.linked_list(&result.vertices, 0..outer.len(), true) else {
        return result;
    };

    if earcut.nodes[outer_node].next == earcut.nodes[outer_node].prev {
        return result;
    }

    if !hole_ranges.is_empty() {
        outer_node = earcut.eliminate_holes(&result.vertices, &hole_ranges, outer_node);
    }

    earcut.earcut_linked(outer_node, &mut result.indices, Pass::Clip);
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Clip,
    Filtered,
    Cured,
}

#[derive(Debug, Clone)]
struct Node {
    /// Index into the vertex buffer
    i: usize,
    p: Vec2,
    prev: usize,
    next: usize,
    steiner: bool,
}

/// Arena of circular doubly linked ring nodes
struct Earcut {
    nodes: Vec<Node>,
}

/// Twice the signed area of the triangle, negative for a convex corner of a
/// ring stored in clockwise order
#[inline]
fn area(p: Vec2, q: Vec2, r: Vec2) -> f64 {
    (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y)
}

#[inline]
fn point_in_triangle(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> bool {
    (c.x - p.x) * (a.y - p.y) >= (a.x - p.x) * (c.y - p.y)
        && (a.x - p.x) * (b.y - p.y) >= (b.x - p.x) * (a.y - p.y)
        && (b.x - p.x) * (c.y - p.y) >= (c.x - p.x) * (b.y - p.y)
}

/// Assuming `p`, `q`, `r` are collinear, checks if `q` lies on segment `p`-`r`
#[inline]
fn on_segment(p: Vec2, q: Vec2, r: Vec2) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

#[inline]
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

fn segments_cross(p1: Vec2, q1: Vec2, p2: Vec2, q2: Vec2) -> bool {
    let o1 = sign(area(p1, q1, p2));
    let o2 = sign(area(p1, q1, q2));
    let o3 = sign(area(p2, q2, p1));
    let o4 = sign(area(p2, q2, q1));

    (o1 != o2 && o3 != o4)
        || (o1 == 0 && on_segment(p1, p2, q1))
        || (o2 == 0 && on_segment(p1, q2, q1))
        || (o3 == 0 && on_segment(p2, p1, q2))
        || (o4 == 0 && on_segment(p2, q1, q2))
}

impl Earcut {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    fn pos(&self, n: usize) -> Vec2 {
        self.nodes[n].p
    }

    #[inline]
    fn next(&self, n: usize) -> usize {
        self.nodes[n].next
    }

    #[inline]
    fn prev(&self, n: usize) -> usize {
        self.nodes[n].prev
    }

    #[inline]
    fn node_area(&self, p: usize, q: usize, r: usize) -> f64 {
        area(self.pos(p), self.pos(q), self.pos(r))
    }

    #[inline]
    fn equals(&self, a: usize, b: usize) -> bool {
        self.pos(a) == self.pos(b)
    }

    /// Links the points of `range` into a circular list with the requested
    /// winding. Returns the last inserted node.
    fn linked_list(
        &mut self,
        points: &[Vec2],
        range: std::ops::Range<usize>,
        clockwise: bool,
    ) -> Option<usize> {
        let mut last = None;
        if clockwise == (ring_signed_area(&points[range.clone()]) > 0.0) {
            for i in range {
                last = Some(self.insert_node(i, points[i], last));
            }
        } else {
            for i in range.rev() {
                last = Some(self.insert_node(i, points[i], last));
            }
        }

        if let Some(l) = last {
            let next = self.next(l);
            if self.equals(l, next) {
                self.remove_node(l);
                last = Some(next);
            }
        }
        last
    }

    fn insert_node(&mut self, i: usize, p: Vec2, last: Option<usize>) -> usize {
        let n = self.nodes.len();
        let (prev, next) = match last {
            Some(last) => (last, self.next(last)),
            None => (n, n),
        };
        self.nodes.push(Node {
            i,
            p,
            prev,
            next,
            steiner: false,
        });
        if let Some(last) = last {
            self.nodes[next].prev = n;
            self.nodes[last].next = n;
        }
        n
    }

    /// Unlinks a node. The removed node keeps its own links so callers can
    /// still walk away from it.
    fn remove_node(&mut self, n: usize) {
        let (prev, next) = (self.prev(n), self.next(n));
        self.nodes[next].prev = prev;
        self.nodes[prev].next = next;
    }

    /// Removes duplicate and collinear points between `start` and `end`
    fn filter_points(&mut self, start: usize, end: Option<usize>) -> usize {
        let mut end = end.unwrap_or(start);
        let mut p = start;

        loop {
            let mut again = false;
            let (prev, next) = (self.prev(p), self.next(p));

            if !self.nodes[p].steiner && (self.equals(p, next) || self.node_area(prev, p, next) == 0.0) {
                self.remove_node(p);
                p = prev;
                end = prev;
                if p == self.next(p) {
                    break;
                }
                again = true;
            } else {
                p = next;
            }

            if !again && p == end {
                break;
            }
        }

        end
    }

    fn earcut_linked(&mut self, ear: usize, triangles: &mut Vec<[u32; 3]>, pass: Pass) {
        let mut ear = ear;
        let mut stop = ear;

        while self.prev(ear) != self.next(ear) {
            let (prev, next) = (self.prev(ear), self.next(ear));

            if self.is_ear(ear) {
                triangles.push([
                    self.nodes[prev].i as u32,
                    self.nodes[ear].i as u32,
                    self.nodes[next].i as u32,
                ]);
                self.remove_node(ear);

                // Skipping the next vertex leaves fewer sliver triangles
                ear = self.next(next);
                stop = ear;
                continue;
            }

            ear = next;

            if ear == stop {
                match pass {
                    Pass::Clip => {
                        let filtered = self.filter_points(ear, None);
                        self.earcut_linked(filtered, triangles, Pass::Filtered);
                    }
                    Pass::Filtered => {
                        let filtered = self.filter_points(ear, None);
                        let cured = self.cure_local_intersections(filtered, triangles);
                        self.earcut_linked(cured, triangles, Pass::Cured);
                    }
                    Pass::Cured => self.split_earcut(ear, triangles),
                }
                break;
            }
        }
    }

    fn is_ear(&self, ear: usize) -> bool {
        let (a, b, c) = (self.prev(ear), ear, self.next(ear));
        let (pa, pb, pc) = (self.pos(a), self.pos(b), self.pos(c));

        // Reflex corners are never ears
        if area(pa, pb, pc) >= 0.0 {
            return false;
        }

        let min = pa.min(pb).min(pc);
        let max = pa.max(pb).max(pc);

        let mut p = self.next(c);
        while p != a {
            let pp = self.pos(p);
            if pp.x >= min.x
                && pp.x <= max.x
                && pp.y >= min.y
                && pp.y <= max.y
                && point_in_triangle(pa, pb, pc, pp)
                && self.node_area(self.prev(p), p, self.next(p)) >= 0.0
            {
                return false;
            }
            p = self.next(p);
        }
        true
    }

    /// Cuts off triangles where two consecutive edges cross their neighbors
    fn cure_local_intersections(&mut self, start: usize, triangles: &mut Vec<[u32; 3]>) -> usize {
        let mut start = start;
        let mut p = start;

        loop {
            let a = self.prev(p);
            let p_next = self.next(p);
            let b = self.next(p_next);

            if !self.equals(a, b)
                && segments_cross(self.pos(a), self.pos(p), self.pos(p_next), self.pos(b))
                && self.locally_inside(a, b)
                && self.locally_inside(b, a)
            {
                triangles.push([
                    self.nodes[a].i as u32,
                    self.nodes[p].i as u32,
                    self.nodes[b].i as u32,
                ]);
                self.remove_node(p);
                self.remove_node(p_next);
                p = b;
                start = b;
            }

            p = self.next(p);
            if p == start {
                break;
            }
        }

        self.filter_points(p, None)
    }

    /// Splits the ring along the first valid diagonal and triangulates both halves
    fn split_earcut(&mut self, start: usize, triangles: &mut Vec<[u32; 3]>) {
        let mut a = start;
        loop {
            let mut b = self.next(self.next(a));
            while b != self.prev(a) {
                if self.nodes[a].i != self.nodes[b].i && self.is_valid_diagonal(a, b) {
                    let c = self.split_polygon(a, b);
                    let a = self.filter_points(a, Some(self.next(a)));
                    let c = self.filter_points(c, Some(self.next(c)));
                    self.earcut_linked(a, triangles, Pass::Clip);
                    self.earcut_linked(c, triangles, Pass::Clip);
                    return;
                }
                b = self.next(b);
            }

            a = self.next(a);
            if a == start {
                break;
            }
        }
    }

    fn eliminate_holes(
        &mut self,
        points: &[Vec2],
        hole_ranges: &[std::ops::Range<usize>],
        outer: usize,
    ) -> usize {
        let mut queue = Vec::with_capacity(hole_ranges.len());
        for range in hole_ranges {
            if range.is_empty() {
                continue;
            }
            if let Some(list) = self.linked_list(points, range.clone(), false) {
                if list == self.next(list) {
                    self.nodes[list].steiner = true;
                }
                queue.push(self.leftmost(list));
            }
        }

        queue.sort_by(|&a, &b| {
            let (pa, pb) = (self.pos(a), self.pos(b));
            pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
        });

        queue
            .into_iter()
            .fold(outer, |outer, hole| self.eliminate_hole(hole, outer))
    }

    fn eliminate_hole(&mut self, hole: usize, outer: usize) -> usize {
        let Some(bridge) = self.find_hole_bridge(hole, outer) else {
            return outer;
        };

        let bridge_reverse = self.split_polygon(bridge, hole);
        self.filter_points(bridge_reverse, Some(self.next(bridge_reverse)));
        self.filter_points(bridge, Some(self.next(bridge)))
    }

    /// Finds an outer ring vertex visible from the leftmost hole vertex
    fn find_hole_bridge(&self, hole: usize, outer: usize) -> Option<usize> {
        let h = self.pos(hole);
        let mut qx = f64::NEG_INFINITY;
        let mut m = None;

        // Cast a ray to the left and find the closest edge it hits
        let mut p = outer;
        loop {
            let (pp, pn) = (self.pos(p), self.pos(self.next(p)));
            if h.y <= pp.y && h.y >= pn.y && pn.y != pp.y {
                let x = pp.x + (h.y - pp.y) * (pn.x - pp.x) / (pn.y - pp.y);
                if x <= h.x && x > qx {
                    qx = x;
                    m = Some(if pp.x < pn.x { p } else { self.next(p) });
                    if x == h.x {
                        return m;
                    }
                }
            }
            p = self.next(p);
            if p == outer {
                break;
            }
        }

        let mut m = m?;

        // Look for points inside the triangle (hole, hit, m) and pick the one
        // with the smallest angle to the ray
        let stop = m;
        let mp = self.pos(m);
        let mut tan_min = f64::INFINITY;

        p = m;
        loop {
            let pp = self.pos(p);
            let (t0, t2) = if h.y < mp.y {
                (Vec2::new(h.x, h.y), Vec2::new(qx, h.y))
            } else {
                (Vec2::new(qx, h.y), Vec2::new(h.x, h.y))
            };

            if h.x >= pp.x && pp.x >= mp.x && h.x != pp.x && point_in_triangle(t0, mp, t2, pp) {
                let tan = (h.y - pp.y).abs() / (h.x - pp.x);
                let cur = self.pos(m);
                if self.locally_inside(p, hole)
                    && (tan < tan_min
                        || (tan == tan_min
                            && (pp.x > cur.x || (pp.x == cur.x && self.sector_contains_sector(m, p)))))
                {
                    m = p;
                    tan_min = tan;
                }
            }

            p = self.next(p);
            if p == stop {
                break;
            }
        }

        Some(m)
    }

    fn sector_contains_sector(&self, m: usize, p: usize) -> bool {
        self.node_area(self.prev(m), m, self.prev(p)) < 0.0
            && self.node_area(self.next(p), m, self.next(m)) < 0.0
    }

    fn leftmost(&self, start: usize) -> usize {
        let mut p = start;
        let mut leftmost = start;
        loop {
            let (pp, lp) = (self.pos(p), self.pos(leftmost));
            if pp.x < lp.x || (pp.x == lp.x && pp.y < lp.y) {
                leftmost = p;
            }
            p = self.next(p);
            if p == start {
                break;
            }
        }
        leftmost
    }

    fn is_valid_diagonal(&self, a: usize, b: usize) -> bool {
        let (a_prev, a_next) = (self.prev(a), self.next(a));
        let (b_prev, b_next) = (self.prev(b), self.next(b));

        self.nodes[a_next].i != self.nodes[b].i
            && self.nodes[a_prev].i != self.nodes[b].i
            && !self.intersects_polygon(a, b)
            && ((self.locally_inside(a, b)
                && self.locally_inside(b, a)
                && self.middle_inside(a, b)
                && (self.node_area(a_prev, a, b_prev) != 0.0 || self.node_area(a, b_prev, b) != 0.0))
                || (self.equals(a, b)
                    && self.node_area(a_prev, a, a_next) > 0.0
                    && self.node_area(b_prev, b, b_next) > 0.0))
    }

    /// Checks if the diagonal `a`-`b` crosses any ring edge
    fn intersects_polygon(&self, a: usize, b: usize) -> bool {
        let (ai, bi) = (self.nodes[a].i, self.nodes[b].i);
        let mut p = a;
        loop {
            let next = self.next(p);
            let (pi, ni) = (self.nodes[p].i, self.nodes[next].i);
            if pi != ai
                && ni != ai
                && pi != bi
                && ni != bi
                && segments_cross(self.pos(p), self.pos(next), self.pos(a), self.pos(b))
            {
                return true;
            }
            p = next;
            if p == a {
                break;
            }
        }
        false
    }

    /// Checks if the diagonal `a`-`b` starts into the interior at `a`
    fn locally_inside(&self, a: usize, b: usize) -> bool {
        let (a_prev, a_next) = (self.prev(a), self.next(a));
        if self.node_area(a_prev, a, a_next) < 0.0 {
            self.node_area(a, b, a_next) >= 0.0 && self.node_area(a, a_prev, b) >= 0.0
        } else {
            self.node_area(a, b, a_prev) < 0.0 || self.node_area(a, a_next, b) < 0.0
        }
    }

    /// Checks if the midpoint of the diagonal `a`-`b` is inside the ring
    fn middle_inside(&self, a: usize, b: usize) -> bool {
        let mid = (self.pos(a) + self.pos(b)) * 0.5;
        let mut inside = false;
        let mut p = a;
        loop {
            let next = self.next(p);
            let (pp, pn) = (self.pos(p), self.pos(next));
            if (pp.y > mid.y) != (pn.y > mid.y)
                && pn.y != pp.y
                && mid.x < (pn.x - pp.x) * (mid.y - pp.y) / (pn.y - pp.y) + pp.x
            {
                inside = !inside;
            }
            p = next;
            if p == a {
                break;
            }
        }
        inside
    }

    /// Links `a` and `b` with a diagonal, splitting the ring in two.
    ///
    /// Returns the duplicate of `b` which belongs to the second ring.
    fn split_polygon(&mut self, a: usize, b: usize) -> usize {
        let a2 = self.nodes.len();
        let mut copy = self.nodes[a].clone();
        copy.steiner = false;
        self.nodes.push(copy);

        let b2 = self.nodes.len();
        let mut copy = self.nodes[b].clone();
        copy.steiner = false;
        self.nodes.push(copy);

        let an = self.next(a);
        let bp = self.prev(b);

        self.nodes[a].next = b;
        self.nodes[b].prev = a;

        self.nodes[a2].next = an;
        self.nodes[an].prev = a2;

        self.nodes[b2].next = a2;
        self.nodes[a2].prev = b2;

        self.nodes[bp].next = b2;
        self.nodes[b2].prev = bp;

        b2
    }
}
