//! In-memory lineage store.
//!
//! This is the reference implementation of `LineageStore`: an arena of spot
//! slots and link slots addressed by stable integer handles, plus a
//! per-timepoint index.
//!
//! ## Limitations
//!
//! - **No spatial index**: `spots_at()` returns every spot of a timepoint.
//! - **Tombstones**: removed spots and links leave empty slots behind so that
//!   handles stay stable; memory is not reclaimed until the store is dropped.

use std::collections::BTreeMap;

use crate::model::*;
use crate::{Error, Result};
use super::{LineageStore, LinkList};

// ============================================================================
// MemoryStore
// ============================================================================

struct SpotSlot {
    spot: Spot,
    /// Every link touching this spot, either direction.
    links: LinkList,
}

/// Arena-backed lineage graph.
#[derive(Default)]
pub struct MemoryStore {
    spots: Vec<Option<SpotSlot>>,
    links: Vec<Option<Link>>,
    /// time → spot handles, ascending
    time_index: BTreeMap<i32, Vec<SpotId>>,
    live_spots: usize,
    live_links: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Handles start at 1, slot index = handle - 1.
    fn slot_index(raw: u64) -> Option<usize> {
        raw.checked_sub(1).map(|i| i as usize)
    }

    fn slot(&self, id: SpotId) -> Option<&SpotSlot> {
        self.spots.get(Self::slot_index(id.0)?)?.as_ref()
    }

    fn slot_mut(&mut self, id: SpotId) -> Option<&mut SpotSlot> {
        self.spots.get_mut(Self::slot_index(id.0)?)?.as_mut()
    }
}

// ============================================================================
// LineageStore impl
// ============================================================================

impl LineageStore for MemoryStore {
    // ========================================================================
    // Spot CRUD
    // ========================================================================

    fn add_spot(&mut self, spot: Spot) -> SpotId {
        let id = SpotId(self.spots.len() as u64 + 1);
        self.time_index.entry(spot.time).or_default().push(id);
        self.spots.push(Some(SpotSlot { spot, links: LinkList::new() }));
        self.live_spots += 1;
        id
    }

    fn spot(&self, id: SpotId) -> Option<&Spot> {
        self.slot(id).map(|s| &s.spot)
    }

    fn remove_spot(&mut self, id: SpotId) -> bool {
        let Some(index) = Self::slot_index(id.0) else { return false };
        let Some(slot) = self.spots.get_mut(index).and_then(Option::take) else {
            return false;
        };
        for link in &slot.links {
            self.remove_link(*link);
        }
        if let Some(ids) = self.time_index.get_mut(&slot.spot.time) {
            ids.retain(|s| *s != id);
            if ids.is_empty() {
                self.time_index.remove(&slot.spot.time);
            }
        }
        self.live_spots -= 1;
        true
    }

    // ========================================================================
    // Link CRUD
    // ========================================================================

    fn add_link(&mut self, source: SpotId, target: SpotId) -> Result<LinkId> {
        if source == target {
            return Err(Error::InvalidLink(format!("spot {source} cannot link to itself")));
        }
        let (src_time, dst_time) = match (self.spot(source), self.spot(target)) {
            (Some(s), Some(t)) => (s.time, t.time),
            (None, _) => return Err(Error::NotFound(format!("Source spot {source}"))),
            (_, None) => return Err(Error::NotFound(format!("Target spot {target}"))),
        };
        if src_time == dst_time {
            return Err(Error::InvalidLink(format!(
                "spots {source} and {target} share timepoint {src_time}"
            )));
        }

        let id = LinkId(self.links.len() as u64 + 1);
        self.links.push(Some(Link::new(id, source, target)));
        self.live_links += 1;

        // Update adjacency for both endpoints
        if let Some(s) = self.slot_mut(source) {
            s.links.push(id);
        }
        if let Some(t) = self.slot_mut(target) {
            t.links.push(id);
        }
        Ok(id)
    }

    fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(Self::slot_index(id.0)?)?.as_ref()
    }

    fn remove_link(&mut self, id: LinkId) -> bool {
        let Some(index) = Self::slot_index(id.0) else { return false };
        let Some(link) = self.links.get_mut(index).and_then(Option::take) else {
            return false;
        };
        for end in [link.source, link.target] {
            if let Some(slot) = self.slot_mut(end) {
                slot.links.retain(|l| *l != id);
            }
        }
        self.live_links -= 1;
        true
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    fn links_of(&self, id: SpotId, dir: Direction) -> LinkList {
        let Some(slot) = self.slot(id) else { return LinkList::new() };
        slot.links
            .iter()
            .copied()
            .filter(|l| match (dir, self.link(*l)) {
                (_, None) => false,
                (Direction::Outgoing, Some(link)) => link.source == id,
                (Direction::Incoming, Some(link)) => link.target == id,
                (Direction::Both, Some(_)) => true,
            })
            .collect()
    }

    fn spots_at(&self, time: i32) -> Vec<SpotId> {
        self.time_index.get(&time).cloned().unwrap_or_default()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    fn spot_count(&self) -> usize {
        self.live_spots
    }

    fn link_count(&self) -> usize {
        self.live_links
    }

    fn time_span(&self) -> Option<TimeWindow> {
        let from = *self.time_index.keys().next()?;
        let till = *self.time_index.keys().next_back()?;
        Some(TimeWindow { from, till })
    }
}

// ============================================================================
// Tests
// ============================================================================
