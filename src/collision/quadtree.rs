//! Quadtree broad phase.
//!
//! The tree is rebuilt from scratch every frame: [`Quadtree::clear`] followed
//! by one [`Quadtree::insert`] per collider. It is never updated
//! incrementally.
//!
//! An entry descends into a child only when it fits entirely inside that
//! child's quadrant. Entries straddling a midpoint, or lying partly outside
//! the root bounds, stay at the node where they stopped. Queries walk every
//! child whose bounds touch the query region and always collect the entries
//! stored along the way, so every true overlap is reported (no false
//! negatives). False positives are expected and are filtered by the narrow
//! phase.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::Handle;
use super::rect::Rect;

/// Entries a node holds before it tries to subdivide.
pub const DEFAULT_MAX_OBJECTS: usize = 10;
/// Depth at which nodes stop subdividing. The root has depth 0.
pub const DEFAULT_MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy)]
struct Entry<H> {
    handle: H,
    bounds: Rect,
}

#[derive(Debug)]
struct Node<H> {
    bounds: Rect,
    depth: usize,
    entries: SmallVec<[Entry<H>; DEFAULT_MAX_OBJECTS]>,
    children: Option<Box<[Node<H>; 4]>>,
}

impl<H: Handle> Node<H> {
    fn new(bounds: Rect, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            entries: SmallVec::new(),
            children: None,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.children = None;
    }

    /// Quadrant order: top-right, top-left, bottom-left, bottom-right.
    fn split(&mut self) {
        let half_w = self.bounds.w * 0.5;
        let half_h = self.bounds.h * 0.5;
        let x = self.bounds.x;
        let y = self.bounds.y;
        let depth = self.depth + 1;
        self.children = Some(Box::new([
            Node::new(Rect::new(x + half_w, y, half_w, half_h), depth),
            Node::new(Rect::new(x, y, half_w, half_h), depth),
            Node::new(Rect::new(x, y + half_h, half_w, half_h), depth),
            Node::new(Rect::new(x + half_w, y + half_h, half_w, half_h), depth),
        ]));
    }

    /// Quadrant that fully contains `bounds`, or `None` if it straddles a
    /// midpoint or leaves this node.
    fn quadrant(&self, bounds: &Rect) -> Option<usize> {
        if !self.bounds.contains_rect(bounds) {
            return None;
        }
        let mid_x = self.bounds.x + self.bounds.w * 0.5;
        let mid_y = self.bounds.y + self.bounds.h * 0.5;

        let top = bounds.bottom() < mid_y;
        let bottom = bounds.y > mid_y;
        let left = bounds.right() < mid_x;
        let right = bounds.x > mid_x;

        match (left, right, top, bottom) {
            (false, true, true, false) => Some(0),
            (true, false, true, false) => Some(1),
            (true, false, false, true) => Some(2),
            (false, true, false, true) => Some(3),
            _ => None,
        }
    }

    fn insert(&mut self, entry: Entry<H>, max_objects: usize, max_depth: usize) {
        if let Some(index) = self.quadrant(&entry.bounds) {
            if let Some(children) = self.children.as_mut() {
                children[index].insert(entry, max_objects, max_depth);
                return;
            }
        }

        self.entries.push(entry);

        if self.entries.len() > max_objects && self.depth < max_depth {
            if self.children.is_none() {
                self.split();
            }
            let stored = std::mem::take(&mut self.entries);
            for entry in stored {
                match self.quadrant(&entry.bounds) {
                    Some(index) => {
                        if let Some(children) = self.children.as_mut() {
                            children[index].insert(entry, max_objects, max_depth);
                        }
                    }
                    None => self.entries.push(entry),
                }
            }
        }
    }

    fn query(&self, region: &Rect, out: &mut Vec<H>) {
        out.extend(self.entries.iter().map(|e| e.handle));
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.bounds.touches(region) {
                    child.query(region, out);
                }
            }
        }
    }

    fn remove(&mut self, handle: H, bounds: &Rect) -> bool {
        if let (Some(index), Some(children)) = (self.quadrant(bounds), self.children.as_mut()) {
            if children[index].remove(handle, bounds) {
                return true;
            }
        }
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        before != self.entries.len()
    }

    fn collect(&self, out: &mut FxHashSet<H>) {
        out.extend(self.entries.iter().map(|e| e.handle));
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect(out);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
            + self
                .children
                .as_ref()
                .map(|c| c.iter().map(Node::len).sum())
                .unwrap_or(0)
    }

    fn node_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map(|c| c.iter().map(Node::node_count).sum())
            .unwrap_or(0)
    }
}

/// Region quadtree over bounded handles.
#[derive(Debug)]
pub struct Quadtree<H> {
    root: Node<H>,
    max_objects: usize,
    max_depth: usize,
}

impl<H: Handle> Quadtree<H> {
    /// Empty tree covering `bounds` with the default capacity and depth.
    pub fn new(bounds: Rect) -> Self {
        Self::with_limits(bounds, DEFAULT_MAX_OBJECTS, DEFAULT_MAX_DEPTH)
    }

    pub fn with_limits(bounds: Rect, max_objects: usize, max_depth: usize) -> Self {
        Self {
            root: Node::new(bounds, 0),
            max_objects: max_objects.max(1),
            max_depth,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    /// Replace the root bounds. Drops every stored entry.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.root = Node::new(bounds, 0);
    }

    /// Release every entry and child node.
    pub fn clear(&mut self) {
        self.root.clear();
    }

    /// Insert `handle` with its world-space `bounds`.
    ///
    /// Returns `false` and stores nothing when `bounds` is not a valid
    /// rectangle (non-finite or zero area).
    pub fn insert(&mut self, handle: H, bounds: Rect) -> bool {
        if !bounds.is_valid() {
            return false;
        }
        self.root
            .insert(Entry { handle, bounds }, self.max_objects, self.max_depth);
        true
    }

    /// Candidate handles that may overlap `region`. Contains every handle
    /// whose bounds overlap `region`, plus unrelated neighbours.
    pub fn query(&self, region: &Rect) -> Vec<H> {
        let mut out = Vec::new();
        self.query_into(region, &mut out);
        out
    }

    /// Like [`Quadtree::query`] but appends to a caller-owned buffer.
    pub fn query_into(&self, region: &Rect, out: &mut Vec<H>) {
        self.root.query(region, out);
    }

    /// Remove `handle`, looking it up by the bounds it was inserted with.
    pub fn remove(&mut self, handle: H, bounds: &Rect) -> bool {
        self.root.remove(handle, bounds)
    }

    /// Every handle stored in the tree.
    pub fn all_entities(&self) -> FxHashSet<H> {
        let mut out = FxHashSet::default();
        self.root.collect(&mut out);
        out
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_subdivided(&self) -> bool {
        self.root.children.is_some()
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}
