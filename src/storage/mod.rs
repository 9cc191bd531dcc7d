//! # Lineage Store Trait
//!
//! This is THE contract between the transcoder and whatever owns the
//! lineage graph. The track-table builder only reads through it; the
//! readers only append through it.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | Arena-backed reference implementation |
//!
//! A store is plain `&self`/`&mut self` data. Mutual exclusion lives one
//! level up in [`SharedGraph`], which hands out a single exclusive guard for
//! the whole duration of an import or export.

pub mod memory;

use std::sync::Arc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use smallvec::SmallVec;

use crate::model::*;
use crate::Result;

pub use memory::MemoryStore;

/// Incident link handles of one spot; lineage nodes rarely have more than
/// one incoming and two outgoing links.
pub type LinkList = SmallVec<[LinkId; 4]>;

// ============================================================================
// LineageStore Trait
// ============================================================================

/// The graph store contract.
pub trait LineageStore {
    // ========================================================================
    // Spot CRUD
    // ========================================================================

    /// Insert a spot and return its new handle.
    fn add_spot(&mut self, spot: Spot) -> SpotId;

    /// Get a spot by handle. Returns None if it was removed or never existed.
    fn spot(&self, id: SpotId) -> Option<&Spot>;

    /// Remove a spot together with all its links. Returns true if it existed.
    fn remove_spot(&mut self, id: SpotId) -> bool;

    // ========================================================================
    // Link CRUD
    // ========================================================================

    /// Create a directed link. Both spots must exist and differ.
    fn add_link(&mut self, source: SpotId, target: SpotId) -> Result<LinkId>;

    fn link(&self, id: LinkId) -> Option<&Link>;

    /// Remove a link. Returns true if it existed.
    fn remove_link(&mut self, id: LinkId) -> bool;

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Links incident to a spot, filtered by stored direction, in creation order.
    fn links_of(&self, id: SpotId, dir: Direction) -> LinkList;

    /// Spots present at one timepoint, in ascending handle order.
    fn spots_at(&self, time: i32) -> Vec<SpotId>;

    // ========================================================================
    // Introspection
    // ========================================================================

    fn spot_count(&self) -> usize;

    fn link_count(&self) -> usize;

    /// Earliest and latest occupied timepoint, None for an empty store.
    fn time_span(&self) -> Option<TimeWindow>;

    /// Spots inside a window, timepoint by timepoint.
    ///
    /// Default: concatenates `spots_at` over the window.
    fn spots_in(&self, window: TimeWindow) -> Vec<SpotId> {
        window.timepoints().flat_map(|t| self.spots_at(t)).collect()
    }

    /// The other end of every link incident to `id`, in creation order.
    fn neighbours(&self, id: SpotId) -> Vec<SpotId> {
        self.links_of(id, Direction::Both)
            .iter()
            .filter_map(|l| self.link(*l))
            .filter_map(|l| l.other_spot(id))
            .collect()
    }
}

// ============================================================================
// SharedGraph
// ============================================================================

/// A lineage store behind one exclusive lock.
///
/// Cloning shares the same store. Batch operations take [`SharedGraph::lock`]
/// once at their start and drop the guard once at their end, never per line.
pub struct SharedGraph<S: LineageStore = MemoryStore> {
    inner: Arc<RwLock<S>>,
}

impl<S: LineageStore> SharedGraph<S> {
    pub fn new(store: S) -> Self {
        Self { inner: Arc::new(RwLock::new(store)) }
    }

    /// Exclusive guard for a whole batch operation.
    pub fn lock(&self) -> RwLockWriteGuard<'_, S> {
        self.inner.write()
    }

    /// Shared guard for inspection between batch operations.
    pub fn read(&self) -> RwLockReadGuard<'_, S> {
        self.inner.read()
    }
}

impl SharedGraph<MemoryStore> {
    pub fn open_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: LineageStore> Clone for SharedGraph<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S: LineageStore + Default> Default for SharedGraph<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
