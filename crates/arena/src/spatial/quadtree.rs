//! QuadTree for spatial indexing.
//!
//! Nodes and items live in two arenas owned by the tree. Nodes split once
//! they hold more than [`MAX_ITEMS`] items and are never merged back; items
//! that straddle a quadrant boundary stay at the node that could not push
//! them down. Callers hold a generation-checked [`QuadHandle`] per item, so
//! removal goes straight to the owning node and a stale handle can never
//! reach a recycled slot.

/// Item count above which a leaf splits into four children.
pub const MAX_ITEMS: usize = 64;

const ROOT: u32 = 0;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Create bounds from center and size.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, size: f32) -> Self {
        Self {
            min_x: cx - size,
            min_y: cy - size,
            max_x: cx + size,
            max_y: cy + size,
        }
    }

    /// Check if two bounds intersect. Touching edges do not count.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.min_x >= self.max_x
            || other.max_x <= self.min_x
            || other.min_y >= self.max_y
            || other.max_y <= self.min_y)
    }

    /// Check if `other` lies entirely inside these bounds.
    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Get the width of the bounds.
    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Get the height of the bounds.
    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Get center X.
    #[inline]
    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }

    /// Get center Y.
    #[inline]
    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }
}

/// Handle to an item stored in a [`QuadTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuadHandle {
    index: u32,
    generation: u32,
}

/// Child quadrant, in the fixed storage order of a node's children.
///
/// `y` grows downwards, so the north half is the `min_y` half.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    NorthEast = 0,
    NorthWest = 1,
    SouthWest = 2,
    SouthEast = 3,
}

#[derive(Debug)]
struct QuadNode {
    bound: Bounds,
    half_width: f32,
    half_height: f32,
    cx: f32,
    cy: f32,
    children: Option<[u32; 4]>,
    /// Slot indices of the items held directly by this node.
    items: Vec<u32>,
}

impl QuadNode {
    fn new(bound: Bounds) -> Self {
        let half_width = bound.width() / 2.0;
        let half_height = bound.height() / 2.0;
        Self {
            bound,
            half_width,
            half_height,
            cx: bound.min_x + half_width,
            cy: bound.min_y + half_height,
            children: None,
            items: Vec::new(),
        }
    }

    /// Quadrant that fully contains `bound`, if any.
    ///
    /// Both edges of the bound must sit strictly on one side of the center
    /// on each axis; anything touching or crossing a center line straddles.
    #[inline]
    fn quadrant(&self, bound: &Bounds) -> Option<Quadrant> {
        let north = bound.max_y < self.cy;
        let south = bound.min_y > self.cy;
        let west = bound.max_x < self.cx;
        let east = bound.min_x > self.cx;

        match (west, east, north, south) {
            (true, _, true, _) => Some(Quadrant::NorthWest),
            (true, _, _, true) => Some(Quadrant::SouthWest),
            (_, true, true, _) => Some(Quadrant::NorthEast),
            (_, true, _, true) => Some(Quadrant::SouthEast),
            _ => None,
        }
    }

    fn child_bounds(&self) -> [Bounds; 4] {
        let w = self.half_width;
        let h = self.half_height;
        let mx = self.bound.min_x;
        let my = self.bound.min_y;
        let mw = mx + w;
        let mh = my + h;
        [
            Bounds::new(mw, my, mw + w, my + h),
            Bounds::new(mx, my, mx + w, my + h),
            Bounds::new(mx, mh, mx + w, mh + h),
            Bounds::new(mw, mh, mw + w, mh + h),
        ]
    }
}

#[derive(Debug)]
struct Entry<K> {
    key: K,
    bound: Bounds,
    /// Node currently holding the item, `None` while detached.
    node: Option<u32>,
    /// Position inside that node's item list.
    pos: usize,
}

#[derive(Debug)]
struct Slot<K> {
    generation: u32,
    entry: Option<Entry<K>>,
}

/// QuadTree for efficient spatial queries.
///
/// `K` is the caller's key for an item (the world uses node ids).
pub struct QuadTree<K> {
    nodes: Vec<QuadNode>,
    slots: Vec<Slot<K>>,
    free: Vec<u32>,
    len: usize,
}

impl<K: Copy> QuadTree<K> {
    /// Create a new QuadTree covering the given bounds.
    pub fn new(bound: Bounds) -> Self {
        Self {
            nodes: vec![QuadNode::new(bound)],
            slots: Vec::with_capacity(1024),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Create a QuadTree for the game world.
    pub fn for_world(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self::new(Bounds::new(min_x, min_y, max_x, max_y))
    }

    /// Bounds of the root node.
    pub fn bounds(&self) -> Bounds {
        self.nodes[ROOT as usize].bound
    }

    /// Insert an item and return its handle.
    pub fn insert(&mut self, key: K, bound: Bounds) -> QuadHandle {
        let entry = Entry { key, bound, node: None, pos: 0 };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                (self.slots.len() - 1) as u32
            }
        };
        self.len += 1;
        self.place(index, ROOT);
        QuadHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Remove an item, returning its key.
    ///
    /// Removing through a stale handle is a bug in the caller: it trips a
    /// debug assertion and is otherwise ignored.
    pub fn remove(&mut self, handle: QuadHandle) -> Option<K> {
        if !self.contains(handle) {
            debug_assert!(false, "removing stale quad handle {:?}", handle);
            return None;
        }
        self.detach(handle.index);
        let slot = &mut self.slots[handle.index as usize];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(entry.key)
    }

    /// Move an item to a new bound by removing and reinserting it.
    /// The handle stays valid. Returns false for a stale handle.
    pub fn reinsert(&mut self, handle: QuadHandle, bound: Bounds) -> bool {
        if !self.contains(handle) {
            debug_assert!(false, "reinserting stale quad handle {:?}", handle);
            return false;
        }
        self.detach(handle.index);
        if let Some(entry) = self.slots[handle.index as usize].entry.as_mut() {
            entry.bound = bound;
        }
        self.place(handle.index, ROOT);
        true
    }

    /// Whether the handle refers to a live item.
    #[inline]
    pub fn contains(&self, handle: QuadHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.entry.is_some())
    }

    /// Key and bound of a live item.
    #[inline]
    pub fn get(&self, handle: QuadHandle) -> Option<(K, Bounds)> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref().map(|e| (e.key, e.bound))
    }

    /// Invoke `callback` for every item whose bound intersects `bound`.
    ///
    /// Takes `&self`, so the tree cannot be mutated while a traversal runs.
    pub fn find<F>(&self, bound: &Bounds, mut callback: F)
    where
        F: FnMut(K, &Bounds),
    {
        let mut stack = vec![ROOT];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            if let Some(children) = node.children {
                match node.quadrant(bound) {
                    Some(quad) => stack.push(children[quad as usize]),
                    None => {
                        for &child in &children {
                            if self.nodes[child as usize].bound.intersects(bound) {
                                stack.push(child);
                            }
                        }
                    }
                }
            }
            for &slot in &node.items {
                if let Some(entry) = self.slots[slot as usize].entry.as_ref() {
                    if entry.bound.intersects(bound) {
                        callback(entry.key, &entry.bound);
                    }
                }
            }
        }
    }

    /// Collect the keys of every item intersecting `bound`.
    pub fn query(&self, bound: &Bounds) -> Vec<K> {
        let mut result = Vec::with_capacity(64);
        self.find(bound, |key, _| result.push(key));
        result
    }

    /// Get the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes, root included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels below and including the root.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(ROOT, 1usize)];
        while let Some((idx, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Some(children) = self.nodes[idx as usize].children {
                stack.extend(children.iter().map(|&c| (c, level + 1)));
            }
        }
        deepest
    }

    /// Items held directly by the root, followed by the per-child totals of
    /// each root quadrant subtree (empty when the root never split).
    pub fn root_distribution(&self) -> (usize, Vec<usize>) {
        let root = &self.nodes[ROOT as usize];
        let children: Vec<usize> = root
            .children
            .map(|c| c.iter().map(|&idx| self.subtree_len(idx)).collect())
            .unwrap_or_default();
        (root.items.len(), children)
    }

    /// Walk every item and check that its back-reference points at a node
    /// listing it at the recorded position.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            for (pos, &slot) in node.items.iter().enumerate() {
                match self.slots[slot as usize].entry.as_ref() {
                    Some(e) if e.node == Some(idx as u32) && e.pos == pos => seen += 1,
                    _ => return false,
                }
            }
        }
        seen == self.len
    }

    fn subtree_len(&self, idx: u32) -> usize {
        let node = &self.nodes[idx as usize];
        let below = node
            .children
            .map(|c| c.iter().map(|&child| self.subtree_len(child)).sum())
            .unwrap_or(0);
        node.items.len() + below
    }

    /// Unlink a slot from its node in O(1).
    fn detach(&mut self, index: u32) {
        let Some((node_idx, pos)) = self.slots[index as usize]
            .entry
            .as_ref()
            .and_then(|e| e.node.map(|n| (n, e.pos)))
        else {
            debug_assert!(false, "detaching unplaced quad item {}", index);
            return;
        };

        let items = &mut self.nodes[node_idx as usize].items;
        if items.get(pos) != Some(&index) {
            debug_assert!(false, "quad item {} not at recorded position", index);
            match items.iter().position(|&s| s == index) {
                Some(found) => self.unlink_at(node_idx, found),
                None => return,
            }
        } else {
            self.unlink_at(node_idx, pos);
        }

        if let Some(entry) = self.slots[index as usize].entry.as_mut() {
            entry.node = None;
        }
    }

    fn unlink_at(&mut self, node_idx: u32, pos: usize) {
        let items = &mut self.nodes[node_idx as usize].items;
        items.swap_remove(pos);
        if let Some(&moved) = items.get(pos) {
            if let Some(entry) = self.slots[moved as usize].entry.as_mut() {
                entry.pos = pos;
            }
        }
    }

    /// Descend from `start` and store the slot at the deepest node whose
    /// single quadrant contains it, splitting that node if it overflows.
    fn place(&mut self, index: u32, start: u32) {
        let Some(bound) = self.slots[index as usize].entry.as_ref().map(|e| e.bound) else {
            return;
        };

        let mut node_idx = start;
        loop {
            let node = &self.nodes[node_idx as usize];
            match (node.children, node.quadrant(&bound)) {
                (Some(children), Some(quad)) => node_idx = children[quad as usize],
                _ => break,
            }
        }

        let node = &mut self.nodes[node_idx as usize];
        node.items.push(index);
        let pos = node.items.len() - 1;
        if let Some(entry) = self.slots[index as usize].entry.as_mut() {
            entry.node = Some(node_idx);
            entry.pos = pos;
        }

        let node = &self.nodes[node_idx as usize];
        if node.children.is_none() && node.items.len() > MAX_ITEMS {
            self.split(node_idx);
        }
    }

    /// Create the four children of a leaf and push down every item that
    /// fits entirely into one of them.
    fn split(&mut self, node_idx: u32) {
        let first = self.nodes.len() as u32;
        let child_bounds = self.nodes[node_idx as usize].child_bounds();
        self.nodes.extend(child_bounds.into_iter().map(QuadNode::new));
        self.nodes[node_idx as usize].children = Some([first, first + 1, first + 2, first + 3]);

        let held = std::mem::take(&mut self.nodes[node_idx as usize].items);
        for index in held {
            let Some(bound) = self.slots[index as usize].entry.as_ref().map(|e| e.bound) else {
                continue;
            };
            let node = &self.nodes[node_idx as usize];
            match node.quadrant(&bound) {
                Some(quad) => {
                    let child = first + quad as u32;
                    if let Some(entry) = self.slots[index as usize].entry.as_mut() {
                        entry.node = None;
                    }
                    self.place(index, child);
                }
                None => {
                    let node = &mut self.nodes[node_idx as usize];
                    node.items.push(index);
                    let pos = node.items.len() - 1;
                    if let Some(entry) = self.slots[index as usize].entry.as_mut() {
                        entry.pos = pos;
                    }
                }
            }
        }
    }
}

impl<K> std::fmt::Debug for QuadTree<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadTree")
            .field("items", &self.len)
            .field("nodes", &self.nodes.len())
            .field("bounds", &self.nodes[ROOT as usize].bound)
            .finish()
    }
}
