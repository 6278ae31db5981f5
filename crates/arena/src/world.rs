//! World state management.
//!
//! Owns every body, the per-type id lists and the quad-tree, and keeps the
//! three consistent: a cell enters and leaves all of them in one call.

use crate::delta::{BodyView, RemovedBody, WorldDelta};
use crate::entity::{Cell, CellData, CellType, EjectedMass, Food, PlayerCell, Virus};
use crate::spatial::{Bounds, QuadTree};
use fixedbitset::FixedBitSet;
use glam::Vec2;
use rand::Rng;
use std::collections::HashMap;

/// A cell entry in the world.
#[derive(Debug)]
pub enum CellEntry {
    Player(PlayerCell),
    Food(Food),
    Virus(Virus),
    Eject(EjectedMass),
}

impl CellEntry {
    /// View the entry through its capability trait.
    #[inline]
    pub fn as_cell(&self) -> &dyn Cell {
        match self {
            CellEntry::Player(c) => c,
            CellEntry::Food(c) => c,
            CellEntry::Virus(c) => c,
            CellEntry::Eject(c) => c,
        }
    }

    #[inline]
    pub fn as_cell_mut(&mut self) -> &mut dyn Cell {
        match self {
            CellEntry::Player(c) => c,
            CellEntry::Food(c) => c,
            CellEntry::Virus(c) => c,
            CellEntry::Eject(c) => c,
        }
    }

    /// Get the common cell data.
    #[inline]
    pub fn data(&self) -> &CellData {
        self.as_cell().data()
    }

    /// Get mutable cell data.
    #[inline]
    pub fn data_mut(&mut self) -> &mut CellData {
        self.as_cell_mut().data_mut()
    }

    #[inline]
    pub fn as_player(&self) -> Option<&PlayerCell> {
        match self {
            CellEntry::Player(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_player_mut(&mut self) -> Option<&mut PlayerCell> {
        match self {
            CellEntry::Player(c) => Some(c),
            _ => None,
        }
    }
}

/// World border bounds.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub width: f32,
    pub height: f32,
}

impl WorldBorder {
    pub fn new(width: f32, height: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self {
            min_x: -half_w,
            min_y: -half_h,
            max_x: half_w,
            max_y: half_h,
            width,
            height,
        }
    }

    /// Get a random position within the border.
    #[inline]
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.random_range(self.min_x..self.max_x),
            rng.random_range(self.min_y..self.max_y),
        )
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Id list with O(1) membership and swap-removal.
#[derive(Debug, Default)]
pub struct IdList {
    ids: Vec<u32>,
    pos: HashMap<u32, usize>,
}

impl IdList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            pos: HashMap::with_capacity(capacity),
        }
    }

    fn push(&mut self, id: u32) {
        if !self.pos.contains_key(&id) {
            self.pos.insert(id, self.ids.len());
            self.ids.push(id);
        }
    }

    fn remove(&mut self, id: u32) -> bool {
        let Some(pos) = self.pos.remove(&id) else {
            return false;
        };
        let last_pos = self.ids.len() - 1;
        if pos != last_pos {
            let swapped_id = self.ids[last_pos];
            self.ids.swap(pos, last_pos);
            self.pos.insert(swapped_id, pos);
        }
        self.ids.pop();
        true
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.pos.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.ids
    }

    /// Copy of the ids, for passes that add or remove cells while iterating.
    #[inline]
    pub fn snapshot(&self) -> Vec<u32> {
        self.ids.clone()
    }
}

/// Bookkeeping for the next [`WorldDelta`].
#[derive(Debug)]
struct ChangeSet {
    added: Vec<u32>,
    /// Ids added since the last delta and still alive.
    fresh: FixedBitSet,
    dirty: FixedBitSet,
    removed: Vec<RemovedBody>,
}

impl ChangeSet {
    fn new() -> Self {
        Self {
            added: Vec::with_capacity(256),
            fresh: FixedBitSet::with_capacity(4096),
            dirty: FixedBitSet::with_capacity(4096),
            removed: Vec::with_capacity(256),
        }
    }

    fn mark(bits: &mut FixedBitSet, id: u32) {
        let idx = id as usize;
        if idx >= bits.len() {
            bits.grow((idx + 1).next_power_of_two());
        }
        bits.insert(idx);
    }

    fn on_added(&mut self, id: u32) {
        self.added.push(id);
        Self::mark(&mut self.fresh, id);
    }

    fn on_updated(&mut self, id: u32) {
        Self::mark(&mut self.dirty, id);
    }

    fn on_removed(&mut self, id: u32, eaten_by: Option<u32>) {
        let idx = id as usize;
        if self.fresh.contains(idx) {
            // Never observed, so never reported.
            self.fresh.set(idx, false);
        } else {
            self.removed.push(RemovedBody { id, eaten_by });
        }
        if idx < self.dirty.len() {
            self.dirty.set(idx, false);
        }
    }
}

/// The game world containing all cells.
#[derive(Debug)]
pub struct World {
    /// Next node ID to assign.
    next_node_id: u32,

    /// All cells by ID.
    pub(crate) cells: HashMap<u32, CellEntry>,

    player_cells: IdList,
    food_cells: IdList,
    virus_cells: IdList,
    eject_cells: IdList,
    /// Ownerless cells that are currently boosting.
    moving_cells: IdList,

    /// World border.
    pub border: WorldBorder,

    /// QuadTree for spatial queries.
    quad_tree: QuadTree<u32>,

    changes: ChangeSet,
}

impl World {
    /// Create a new world with the given border size.
    pub fn new(width: f32, height: f32) -> Self {
        let border = WorldBorder::new(width, height);
        Self {
            next_node_id: 1,
            cells: HashMap::with_capacity(2048),
            player_cells: IdList::with_capacity(256),
            food_cells: IdList::with_capacity(1024),
            virus_cells: IdList::with_capacity(64),
            eject_cells: IdList::with_capacity(256),
            moving_cells: IdList::with_capacity(256),
            quad_tree: QuadTree::for_world(border.min_x, border.min_y, border.max_x, border.max_y),
            border,
            changes: ChangeSet::new(),
        }
    }

    /// Get the next node ID.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_node_id;
        self.next_node_id = self.next_node_id.wrapping_add(1);
        if self.next_node_id == 0 {
            self.next_node_id = 1; // Skip 0
        }
        id
    }

    /// Get a cell by ID.
    #[inline]
    pub fn get_cell(&self, id: u32) -> Option<&CellEntry> {
        self.cells.get(&id)
    }

    /// Get a mutable cell by ID.
    ///
    /// Position or size changes made through this reference must be followed
    /// by [`World::refresh`].
    #[inline]
    pub fn get_cell_mut(&mut self, id: u32) -> Option<&mut CellEntry> {
        self.cells.get_mut(&id)
    }

    /// Get a live player cell by ID.
    #[inline]
    pub fn player_cell(&self, id: u32) -> Option<&PlayerCell> {
        self.cells.get(&id).and_then(CellEntry::as_player)
    }

    /// Add a cell to the world, the index and its type list.
    pub fn add_cell(&mut self, mut entry: CellEntry) -> u32 {
        let data = entry.data();
        let id = data.node_id;
        let cell_type = data.cell_type;
        let is_moving = data.is_moving && data.owner_id.is_none();

        let handle = self.quad_tree.insert(id, data.bounds());
        entry.as_cell_mut().on_add(handle);

        self.type_list_mut(cell_type).push(id);
        if is_moving {
            self.moving_cells.push(id);
        }
        self.cells.insert(id, entry);
        self.changes.on_added(id);
        id
    }

    /// Add a player cell to the world.
    pub fn add_player_cell(&mut self, cell: PlayerCell) -> u32 {
        self.add_cell(CellEntry::Player(cell))
    }

    /// Add a food cell to the world.
    pub fn add_food(&mut self, cell: Food) -> u32 {
        self.add_cell(CellEntry::Food(cell))
    }

    /// Add a virus to the world.
    pub fn add_virus(&mut self, cell: Virus) -> u32 {
        self.add_cell(CellEntry::Virus(cell))
    }

    /// Add ejected mass to the world.
    pub fn add_eject(&mut self, cell: EjectedMass) -> u32 {
        self.add_cell(CellEntry::Eject(cell))
    }

    /// Remove from moving cells list (O(1)).
    pub fn remove_from_moving(&mut self, id: u32) {
        self.moving_cells.remove(id);
    }

    /// Remove a cell from the world, the index and every list.
    ///
    /// `eaten_by` is reported to observers with the removal.
    pub fn remove_cell(&mut self, id: u32, eaten_by: Option<u32>) -> Option<CellEntry> {
        let mut entry = self.cells.remove(&id)?;

        if let Some(handle) = entry.data().quad_handle() {
            self.quad_tree.remove(handle);
        }
        entry.as_cell_mut().on_remove();

        let cell_type = entry.data().cell_type;
        self.type_list_mut(cell_type).remove(id);
        self.moving_cells.remove(id);
        self.changes.on_removed(id, eaten_by);
        Some(entry)
    }

    /// Reinsert a cell's current bound into the index and mark it updated.
    pub fn refresh(&mut self, id: u32) {
        let Some(cell) = self.cells.get(&id) else {
            return;
        };
        let data = cell.data();
        if let Some(handle) = data.quad_handle() {
            self.quad_tree.reinsert(handle, data.bounds());
        }
        self.changes.on_updated(id);
    }

    /// Ids of every indexed cell whose bound intersects `bound`.
    #[inline]
    pub fn query(&self, bound: &Bounds) -> Vec<u32> {
        self.quad_tree.query(bound)
    }

    /// Visit every indexed cell whose bound intersects `bound`.
    #[inline]
    pub fn find<F: FnMut(u32, &Bounds)>(&self, bound: &Bounds, callback: F) {
        self.quad_tree.find(bound, callback);
    }

    #[inline]
    pub fn player_cells(&self) -> &IdList {
        &self.player_cells
    }

    #[inline]
    pub fn food_cells(&self) -> &IdList {
        &self.food_cells
    }

    #[inline]
    pub fn virus_cells(&self) -> &IdList {
        &self.virus_cells
    }

    #[inline]
    pub fn eject_cells(&self) -> &IdList {
        &self.eject_cells
    }

    #[inline]
    pub fn moving_cells(&self) -> &IdList {
        &self.moving_cells
    }

    fn type_list_mut(&mut self, cell_type: CellType) -> &mut IdList {
        match cell_type {
            CellType::Player => &mut self.player_cells,
            CellType::Food => &mut self.food_cells,
            CellType::Virus => &mut self.virus_cells,
            CellType::EjectedMass => &mut self.eject_cells,
        }
    }

    /// Get the count of each cell type.
    #[inline]
    pub fn cell_counts(&self) -> CellCounts {
        CellCounts {
            players: self.player_cells.len(),
            food: self.food_cells.len(),
            viruses: self.virus_cells.len(),
            ejected: self.eject_cells.len(),
            moving: self.moving_cells.len(),
            total: self.cells.len(),
        }
    }

    /// Iterate over all cells.
    #[inline]
    pub fn iter_cells(&self) -> impl Iterator<Item = (&u32, &CellEntry)> {
        self.cells.iter()
    }

    /// Number of index nodes and levels, for diagnostics.
    pub fn index_shape(&self) -> (usize, usize) {
        (self.quad_tree.node_count(), self.quad_tree.depth())
    }

    /// Check that every live cell is indexed exactly once under its current
    /// bound and that the index holds nothing else.
    pub fn index_is_consistent(&self) -> bool {
        if self.quad_tree.len() != self.cells.len() || !self.quad_tree.is_consistent() {
            return false;
        }
        self.cells.iter().all(|(&id, cell)| {
            let data = cell.data();
            !data.is_removed
                && data
                    .quad_handle()
                    .and_then(|h| self.quad_tree.get(h))
                    .is_some_and(|(key, bound)| key == id && bound == data.bounds())
        })
    }

    /// Drain the changes recorded since the previous call.
    pub fn take_delta(&mut self, tick: u64) -> WorldDelta {
        let changes = &mut self.changes;

        let mut added = Vec::with_capacity(changes.added.len());
        for id in changes.added.drain(..) {
            if !changes.fresh.contains(id as usize) {
                continue;
            }
            if let Some(cell) = self.cells.get(&id) {
                added.push(BodyView::from(cell.data()));
            }
        }

        let mut updated = Vec::new();
        for idx in changes.dirty.ones() {
            if changes.fresh.contains(idx) {
                continue;
            }
            if let Some(cell) = self.cells.get(&(idx as u32)) {
                updated.push(BodyView::from(cell.data()));
            }
        }

        changes.fresh.clear();
        changes.dirty.clear();
        WorldDelta {
            tick,
            added,
            updated,
            removed: std::mem::take(&mut changes.removed),
        }
    }
}

/// Cell count statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCounts {
    pub players: usize,
    pub food: usize,
    pub viruses: usize,
    pub ejected: usize,
    pub moving: usize,
    pub total: usize,
}
