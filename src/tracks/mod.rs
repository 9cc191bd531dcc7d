//! # Track Table Transcoder
//!
//! Converts between the lineage graph and the flat, tab-separated track
//! table used to exchange cell-lineage results.
//!
//! ```text
//! LineageStore → TrackTableBuilder → TrackTable → write_track_table() → text
//! text → read_track_table() → spots + links appended to a LineageStore
//! ```
//!
//! ## File format
//!
//! ```text
//! # from project /data/embryo.mastodon
//! # TIME	X	Y	Z	TRACK_ID	PARENT_TRACK_ID	SPOT LABEL
//!
//! # one tree of tracks:
//! #	1	2	3
//! 0	10.5	20	3	1	0	cell-a
//! 1	11	20.5	3	1	0	cell-a
//! ...
//! ```
//!
//! Data rows are `time, x, y, z, trackID, parentTrackID, label[, radius]`
//! with coordinates in image space. Blank lines and `#` lines are ignored on
//! read, so manifests may be missing, repeated or rearranged.

pub mod builder;
pub mod forest;
pub mod reader;
pub mod writer;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ExportConfig, ImportConfig};
use crate::model::{SpotId, TrackId};
use crate::storage::{LineageStore, SharedGraph};
use crate::transform::CoordinateMapper;
use crate::{Error, Result};

pub use builder::{TrackTable, TrackTableBuilder};
pub use forest::Forest;
pub use reader::{parse_line, read_track_table, ImportSummary, ParsedLine, TrackRecord, TrackTableReader};
pub use writer::{write_track_table, ExportSummary};

// ============================================================================
// Anomalies
// ============================================================================

/// A recoverable inconsistency found while transcoding.
///
/// Anomalies never abort an operation. Each one is logged at `error` level
/// when detected and collected into the operation's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anomaly {
    /// A spot has more than one earlier-time link. One entry is reported per
    /// excess link; the spot restarts as a lineage root.
    MergeTopologyViolation {
        spot: SpotId,
        time: i32,
        label: String,
        /// Earlier-time spot whose link was disregarded.
        ignored_source: SpotId,
        incoming: usize,
    },
    /// A track names a parent track that never appeared in the input;
    /// the parent link was dropped.
    UnresolvedParentReference { track: TrackId, parent: TrackId },
    /// The parent track exists but the store refused the link to it,
    /// e.g. both ends share a timepoint. The link was dropped.
    RejectedParentLink { track: TrackId, parent: TrackId, reason: String },
    /// A child segment could not be placed into its parent's tree.
    ForestInconsistency { track: TrackId, parent: TrackId },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::MergeTopologyViolation { spot, time, label, ignored_source, incoming } => write!(
                f,
                "spot {spot} ({label:?}, t={time}) has multiple ({incoming}) older-time-point links; \
                 ignoring link from spot {ignored_source}"
            ),
            Anomaly::UnresolvedParentReference { track, parent } => {
                write!(f, "track {track} references parent track {parent} which never appeared")
            }
            Anomaly::RejectedParentLink { track, parent, reason } => {
                write!(f, "track {track} could not be linked to parent track {parent}: {reason}")
            }
            Anomaly::ForestInconsistency { track, parent } => {
                write!(f, "track {track} could not find the track tree of its parent {parent}")
            }
        }
    }
}

// ============================================================================
// Lock-holding entry points
// ============================================================================

/// Segment the graph and write it as a track table.
///
/// Holds the graph's exclusive lock for the whole traversal and write.
/// Output is streamed; on an I/O error whatever was already written stays.
pub fn export_track_table<S, M>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &ExportConfig,
    writer: &mut dyn Write,
) -> Result<(TrackTable, ExportSummary)>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
{
    config.validate()?;
    let store = graph.lock();
    let table = TrackTableBuilder::new(&*store, config).build();
    let summary = write_track_table(&table, &*store, mapper, config, writer)?;
    info!(
        trees = summary.trees,
        segments = summary.segments,
        spots = summary.spots,
        anomalies = table.anomalies.len(),
        "exported track table"
    );
    Ok((table, summary))
}

/// [`export_track_table`] into a freshly created (truncated) file.
pub fn export_track_table_file<S, M>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &ExportConfig,
    path: impl AsRef<Path>,
) -> Result<(TrackTable, ExportSummary)>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
{
    let path = path.as_ref();
    config.validate()?;
    let file = File::create(path).map_err(|e| Error::file(path, e))?;
    let mut out = BufWriter::new(file);
    let result = export_track_table(graph, mapper, config, &mut out).map_err(|e| e.in_file(path))?;
    out.flush().map_err(|e| Error::file(path, e))?;
    Ok(result)
}

/// Parse a track table and append its spots and links to the graph.
///
/// Holds the graph's exclusive lock for the whole parse. A malformed line
/// aborts the import; spots from earlier lines stay in the graph.
pub fn import_track_table<S, M, R>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &ImportConfig,
    reader: R,
) -> Result<ImportSummary>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
    R: std::io::BufRead,
{
    let mut store = graph.lock();
    let summary = read_track_table(&mut *store, mapper, config, reader)?;
    info!(
        spots = summary.spots,
        links = summary.links,
        tracks = summary.tracks,
        anomalies = summary.anomalies.len(),
        "imported track table"
    );
    Ok(summary)
}

/// [`import_track_table`] from a file.
pub fn import_track_table_file<S, M>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &ImportConfig,
    path: impl AsRef<Path>,
) -> Result<ImportSummary>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
{
    let path = path.as_ref();
    config.validate()?;
    let file = File::open(path).map_err(|e| Error::file(path, e))?;
    import_track_table(graph, mapper, config, BufReader::new(file)).map_err(|e| e.in_file(path))
}
