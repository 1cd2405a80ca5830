use crate::api::SpatialIndex;
use crate::types::Rect;

/// Root is depth 1; nodes at this depth never split further.
pub const MAX_DEPTH: usize = 5;

struct Node<T> {
    boundary: Rect,
    depth: usize,
    items: Vec<(Rect, T)>,
    children: [Option<usize>; 4],
}

impl<T> Node<T> {
    fn new(boundary: Rect, depth: usize) -> Self {
        Self { boundary, depth, items: Vec::new(), children: [None; 4] }
    }

    /// Child quadrant that fully contains `rect`, or `None` when it straddles
    /// a midpoint line. Quadrants: 0 = low x/low y, 1 = high x/low y,
    /// 2 = low x/high y, 3 = high x/high y.
    fn quadrant(&self, rect: &Rect) -> Option<usize> {
        let mid_x = self.boundary.left() + self.boundary.width * 0.5;
        let mid_y = self.boundary.bottom() + self.boundary.height * 0.5;
        let column = if rect.right() < mid_x {
            0
        } else if rect.left() >= mid_x {
            1
        } else {
            return None;
        };
        if rect.top() < mid_y {
            Some(column)
        } else if rect.bottom() >= mid_y {
            Some(column + 2)
        } else {
            None
        }
    }

    fn child_boundary(&self, quadrant: usize) -> Rect {
        let w = self.boundary.width * 0.5;
        let h = self.boundary.height * 0.5;
        let x = self.boundary.x + if quadrant % 2 == 1 { w } else { 0.0 };
        let y = self.boundary.y + if quadrant >= 2 { h } else { 0.0 };
        Rect::new(x, y, w, h)
    }
}

/// Fixed-bounds quadtree over `(Rect, T)` pairs.
///
/// Every value is stored exactly once, at the deepest node whose quadrant
/// fully contains its rect (or at depth [`MAX_DEPTH`]). Rects that do not fit
/// inside the root boundary are rejected, never stored.
pub struct QuadTree<T> {
    nodes: Vec<Node<T>>,
    len: usize,
}

impl<T: Copy + PartialEq> QuadTree<T> {
    pub fn new(bounds: Rect) -> Self {
        Self { nodes: vec![Node::new(bounds, 1)], len: 0 }
    }

    /// Root boundary.
    pub fn bounds(&self) -> Rect {
        self.nodes[0].boundary
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated nodes (root included).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Stored rect and node depth for `value`, if present.
    pub fn find(&self, value: T) -> Option<(Rect, usize)> {
        self.nodes.iter().find_map(|node| {
            node.items
                .iter()
                .find(|(_, v)| *v == value)
                .map(|(rect, _)| (*rect, node.depth))
        })
    }

    pub fn contains(&self, value: T) -> bool {
        self.find(value).is_some()
    }

    fn child_or_create(&mut self, node: usize, quadrant: usize) -> usize {
        if let Some(child) = self.nodes[node].children[quadrant] {
            return child;
        }
        let boundary = self.nodes[node].child_boundary(quadrant);
        let depth = self.nodes[node].depth + 1;
        let idx = self.nodes.len();
        self.nodes.push(Node::new(boundary, depth));
        self.nodes[node].children[quadrant] = Some(idx);
        idx
    }
}

impl<T: Copy + PartialEq> SpatialIndex<T> for QuadTree<T> {
    fn insert(&mut self, rect: Rect, value: T) -> bool {
        if !self.bounds().contains(&rect) {
            return false;
        }
        let mut node = 0;
        loop {
            let depth = self.nodes[node].depth;
            match self.nodes[node].quadrant(&rect) {
                Some(q) if depth < MAX_DEPTH => node = self.child_or_create(node, q),
                _ => {
                    self.nodes[node].items.push((rect, value));
                    self.len += 1;
                    return true;
                }
            }
        }
    }

    fn query(&self, rect: &Rect) -> Vec<T> {
        let mut out = Vec::new();
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.boundary.intersects(rect) {
                continue;
            }
            out.extend(node.items.iter().filter(|(r, _)| r.intersects(rect)).map(|(_, v)| *v));
            stack.extend(node.children.iter().flatten());
        }
        out
    }

    fn remove(&mut self, value: T) -> bool {
        for node in &mut self.nodes {
            if let Some(pos) = node.items.iter().position(|(_, v)| *v == value) {
                node.items.swap_remove(pos);
                self.len -= 1;
                return true;
            }
        }
        false
    }

    fn clear(&mut self) {
        let bounds = self.bounds();
        self.nodes.clear();
        self.nodes.push(Node::new(bounds, 1));
        self.len = 0;
    }
}
