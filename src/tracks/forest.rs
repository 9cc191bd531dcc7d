//! Grouping of track segments into lineage trees.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::TrackId;

/// Trees of track ids, in the order their roots were planted.
///
/// Membership is indexed by a map from track to tree so that grafting a
/// child onto its parent's tree is a lookup rather than a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<Vec<TrackId>>,
    tree_of: HashMap<TrackId, usize>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new tree containing only `root`. Returns the tree index.
    pub fn plant(&mut self, root: TrackId) -> usize {
        let index = self.trees.len();
        self.trees.push(vec![root]);
        self.tree_of.insert(root, index);
        index
    }

    /// Add `child` to the tree holding `parent`.
    ///
    /// Returns None when the parent belongs to no tree or the child is
    /// already placed; the forest is left unchanged in that case.
    pub fn graft(&mut self, child: TrackId, parent: TrackId) -> Option<usize> {
        if self.tree_of.contains_key(&child) {
            return None;
        }
        let index = *self.tree_of.get(&parent)?;
        self.trees[index].push(child);
        self.tree_of.insert(child, index);
        Some(index)
    }

    /// Remove a track from whichever tree holds it. Returns true if present.
    pub fn prune(&mut self, track: TrackId) -> bool {
        match self.tree_of.remove(&track) {
            Some(index) => {
                self.trees[index].retain(|t| *t != track);
                true
            }
            None => false,
        }
    }

    pub fn tree_of(&self, track: TrackId) -> Option<usize> {
        self.tree_of.get(&track).copied()
    }

    /// Non-empty trees, each listing member ids in insertion order.
    pub fn trees(&self) -> impl Iterator<Item = &[TrackId]> {
        self.trees.iter().filter(|t| !t.is_empty()).map(Vec::as_slice)
    }

    /// Number of non-empty trees.
    pub fn len(&self) -> usize {
        self.trees().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
