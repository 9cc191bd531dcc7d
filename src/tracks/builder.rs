//! Graph → track segments.
//!
//! Walks every lineage tree depth-first from its roots and cuts it into
//! maximal non-branching segments:
//!
//! - a spot with no earlier-time link inside the window is a root and opens
//!   a segment with parent 0;
//! - a spot with exactly one earlier-time link prolongs its predecessor's
//!   segment;
//! - a spot with several later-time links is a division; each follower opens
//!   a child segment the first time it is visited;
//! - a spot with several earlier-time links is a merge. Its links are
//!   disregarded, a child segment that was just opened for it is removed, and
//!   it restarts as a root.
//!
//! Links are classified by the timepoints of their ends, not by their stored
//! direction. Segment ids are allocated in discovery order, globally.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{error, trace};

use crate::config::ExportConfig;
use crate::model::*;
use crate::storage::LineageStore;
use super::{Anomaly, Forest};

// ============================================================================
// TrackTable
// ============================================================================

/// Segments of one export batch, grouped into trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTable {
    /// Ordered by ascending id.
    pub segments: Vec<TrackSegment>,
    pub forest: Forest,
    pub anomalies: Vec<Anomaly>,
}

impl TrackTable {
    pub fn segment(&self, id: TrackId) -> Option<&TrackSegment> {
        self.segments
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.segments[i])
    }

    /// Segment that holds a spot.
    pub fn segment_of(&self, spot: SpotId) -> Option<&TrackSegment> {
        self.segments.iter().find(|s| s.spots.contains(&spot))
    }

    /// Direct children of a segment, in id order.
    pub fn children(&self, parent: TrackId) -> impl Iterator<Item = &TrackSegment> {
        self.segments.iter().filter(move |s| s.parent == parent && !parent.is_root())
    }

    pub fn roots(&self) -> impl Iterator<Item = &TrackSegment> {
        self.segments.iter().filter(|s| s.is_root())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total spots across all segments.
    pub fn spot_count(&self) -> usize {
        self.segments.iter().map(TrackSegment::len).sum()
    }

    fn segment_mut(&mut self, id: TrackId) -> Option<&mut TrackSegment> {
        let i = self.segments.binary_search_by_key(&id, |s| s.id).ok()?;
        Some(&mut self.segments[i])
    }
}

// ============================================================================
// Builder
// ============================================================================

/// How the walk arrived at a spot.
#[derive(Debug, Clone, Copy)]
enum Visit {
    Root(SpotId),
    /// Sole follower of the previous spot of `track`.
    Continue { spot: SpotId, track: TrackId },
    /// Follower of a division (or after a time gap); opens a child of `parent`.
    Branch { spot: SpotId, parent: TrackId },
}

impl Visit {
    fn spot(self) -> SpotId {
        match self {
            Visit::Root(spot) | Visit::Continue { spot, .. } | Visit::Branch { spot, .. } => spot,
        }
    }
}

/// Earlier- and later-time neighbours of one spot within the window.
#[derive(Default)]
struct Neighbourhood {
    backward: SmallVec<[SpotId; 2]>,
    forward: SmallVec<[(SpotId, i32); 2]>,
}

/// One-shot segmentation pass over a store snapshot.
pub struct TrackTableBuilder<'s, S: LineageStore + ?Sized> {
    store: &'s S,
    window: TimeWindow,
    split_on_gaps: bool,
    next_id: u32,
    visited: HashSet<SpotId>,
    table: TrackTable,
}

impl<'s, S: LineageStore + ?Sized> TrackTableBuilder<'s, S> {
    pub fn new(store: &'s S, config: &ExportConfig) -> Self {
        Self {
            store,
            window: config.window,
            split_on_gaps: config.split_on_gaps,
            next_id: 1,
            visited: HashSet::new(),
            table: TrackTable::default(),
        }
    }

    /// Segment every tree rooted inside the window.
    pub fn build(mut self) -> TrackTable {
        for time in self.window.timepoints() {
            for spot in self.store.spots_at(time) {
                if self.visited.contains(&spot) {
                    continue;
                }
                if self.neighbourhood(spot, time).backward.is_empty() {
                    self.walk(spot);
                }
            }
        }
        self.table
    }

    fn neighbourhood(&self, spot: SpotId, time: i32) -> Neighbourhood {
        let mut hood = Neighbourhood::default();
        for other in self.store.neighbours(spot) {
            let Some(other_time) = self.store.spot(other).map(|s| s.time) else { continue };
            if !self.window.contains(other_time) {
                continue;
            }
            if other_time < time {
                hood.backward.push(other);
            } else if other_time > time {
                hood.forward.push((other, other_time));
            }
        }
        hood
    }

    fn walk(&mut self, root: SpotId) {
        let store = self.store;
        let mut stack = vec![Visit::Root(root)];

        while let Some(visit) = stack.pop() {
            let spot = visit.spot();
            if !self.visited.insert(spot) {
                continue;
            }
            let Some(data) = store.spot(spot) else { continue };
            let time = data.time;
            let hood = self.neighbourhood(spot, time);

            let mut track = match visit {
                Visit::Root(_) => self.open(spot, time, TrackId::ROOT),
                Visit::Continue { track, .. } => track,
                Visit::Branch { parent, .. } => self.open(spot, time, parent),
            };

            if hood.backward.len() > 1 {
                self.report_merge(spot, data, &hood.backward);
                match visit {
                    Visit::Branch { .. } => {
                        trace!(spot = %spot, track = %track, "merge supersedes freshly opened track");
                        self.remove(track);
                    }
                    _ => trace!(spot = %spot, track = %track, "merge leaves track"),
                }
                track = self.open(spot, time, TrackId::ROOT);
            } else if let Visit::Continue { .. } = visit {
                if let Some(segment) = self.table.segment_mut(track) {
                    segment.extend(spot, time);
                }
                trace!(spot = %spot, track = %track, time, "extended track");
            }

            match hood.forward.as_slice() {
                [] => {}
                [(next, next_time)] => {
                    if self.split_on_gaps && *next_time != time + 1 {
                        stack.push(Visit::Branch { spot: *next, parent: track });
                    } else {
                        stack.push(Visit::Continue { spot: *next, track });
                    }
                }
                followers => {
                    // reversed so the first follower is walked first
                    for (child, _) in followers.iter().rev() {
                        stack.push(Visit::Branch { spot: *child, parent: track });
                    }
                }
            }
        }
    }

    fn open(&mut self, spot: SpotId, time: i32, parent: TrackId) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        self.table.segments.push(TrackSegment::open(id, spot, time, parent));

        if parent.is_root() {
            self.table.forest.plant(id);
        } else if self.table.forest.graft(id, parent).is_none() {
            let anomaly = Anomaly::ForestInconsistency { track: id, parent };
            error!("{anomaly}");
            self.table.anomalies.push(anomaly);
        }
        trace!(spot = %spot, track = %id, parent = %parent, time, "started track");
        id
    }

    fn remove(&mut self, id: TrackId) {
        self.table.segments.retain(|s| s.id != id);
        self.table.forest.prune(id);
    }

    fn report_merge(&mut self, spot: SpotId, data: &Spot, sources: &[SpotId]) {
        for ignored in &sources[1..] {
            let anomaly = Anomaly::MergeTopologyViolation {
                spot,
                time: data.time,
                label: data.label.clone(),
                ignored_source: *ignored,
                incoming: sources.len(),
            };
            error!("{anomaly}");
            self.table.anomalies.push(anomaly);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
