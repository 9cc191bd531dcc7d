//! Link (temporal edge) between two spots.

use serde::{Deserialize, Serialize};
use super::SpotId;

/// Opaque link handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which incident links of a spot to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A directed link, normally from an earlier-time spot to a later-time spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: SpotId,
    pub target: SpotId,
}

impl Link {
    pub fn new(id: LinkId, source: SpotId, target: SpotId) -> Self {
        Self { id, source, target }
    }

    /// The "other" end of the link from the given spot.
    pub fn other_spot(&self, from: SpotId) -> Option<SpotId> {
        if from == self.source { Some(self.target) }
        else if from == self.target { Some(self.source) }
        else { None }
    }
}
