//! Track segments: maximal non-branching runs of spots.

use serde::{Deserialize, Serialize};
use super::SpotId;

/// Track segment identifier as written in the track table.
///
/// `TrackId::ROOT` (0) is reserved for "no parent"; allocated ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl TrackId {
    pub const ROOT: TrackId = TrackId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One track segment with its member spots in time order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub id: TrackId,
    pub start: i32,
    /// Time of the last member spot seen so far; final once the segment closes.
    pub end: i32,
    /// Parent segment, `TrackId::ROOT` for a lineage root.
    pub parent: TrackId,
    pub spots: Vec<SpotId>,
}

impl TrackSegment {
    pub fn open(id: TrackId, first: SpotId, time: i32, parent: TrackId) -> Self {
        Self {
            id,
            start: time,
            end: time,
            parent,
            spots: vec![first],
        }
    }

    /// Append a later spot and move the end time forward.
    ///
    /// The caller visits every spot once; no membership check is made.
    pub fn extend(&mut self, spot: SpotId, time: i32) {
        self.spots.push(spot);
        self.end = time;
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_root()
    }
}
