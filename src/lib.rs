//! # lineage-tracks: Lineage Graph ⇄ Track Table Transcoder
//!
//! Moves cell-lineage results between an in-memory graph of tracked
//! detections and two flat text formats: the tab-separated track table
//! (non-branching segments with parent pointers) and plain point clouds.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `LineageStore` is the contract between the transcoder and the graph owner
//! 2. **Clean DTOs**: `Spot`, `Link`, `TrackSegment` cross all boundaries
//! 3. **One lock per batch**: every import/export takes the store's exclusive lock once
//! 4. **Repair, log, report**: topology anomalies are fixed locally and returned as `Anomaly` values
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lineage_tracks::{ExportConfig, IdentityMapper, SharedGraph, Spot, TimeWindow};
//! use lineage_tracks::storage::LineageStore;
//!
//! # fn example() -> lineage_tracks::Result<()> {
//! let graph = SharedGraph::open_memory();
//! {
//!     let mut store = graph.lock();
//!     let a = store.add_spot(Spot::new(0, [1.0, 2.0, 3.0]).with_label("a"));
//!     let b = store.add_spot(Spot::new(1, [1.5, 2.0, 3.0]).with_label("a"));
//!     store.add_link(a, b)?;
//! }
//!
//! let config = ExportConfig::new(TimeWindow::new(0, 1)?).with_provenance("demo");
//! let mut out = Vec::new();
//! let (table, _) = lineage_tracks::tracks::export_track_table(&graph, &IdentityMapper, &config, &mut out)?;
//! assert_eq!(table.len(), 1);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod transform;
pub mod storage;
pub mod config;
pub mod tracks;
pub mod points;

mod lines;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Spot, SpotId, Shape, Link, LinkId, Direction,
    TrackId, TrackSegment, TimeWindow,
};

// ============================================================================
// Re-exports: Storage, mapping, configuration
// ============================================================================

pub use storage::{LineageStore, MemoryStore, SharedGraph};
pub use transform::{AffineTransform3D, CoordinateMapper, IdentityMapper};
pub use config::{ExportConfig, ImportConfig, Placement, PointExportConfig, PointImportConfig};

// ============================================================================
// Re-exports: Transcoder
// ============================================================================

pub use tracks::{Anomaly, ExportSummary, Forest, ImportSummary, TrackTable, TrackTableBuilder};
pub use points::{PointFormat, PointSummary};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed record at line {line} ({content:?}): {reason}")]
    MalformedRecord { line: usize, content: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error on {}: {source}", path.display())]
    File {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn file(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::File { path: path.to_path_buf(), source }
    }

    /// Name the file a bare I/O error happened on; other errors pass through.
    pub(crate) fn in_file(self, path: &std::path::Path) -> Self {
        match self {
            Error::Io(source) => Error::file(path, source),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
