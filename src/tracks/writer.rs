//! Track table → text.

use std::borrow::Cow;
use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ExportConfig;
use crate::model::TrackId;
use crate::storage::LineageStore;
use crate::transform::CoordinateMapper;
use crate::Result;
use super::TrackTable;

pub(crate) const DELIM: &str = "\t";

/// Counts of what was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub trees: usize,
    pub segments: usize,
    pub spots: usize,
}

/// Write the segments of `table` tree by tree, one row per spot.
///
/// Coordinates are mapped from world to image space. Writing is a single
/// forward pass; an I/O error aborts with earlier output left in place.
pub fn write_track_table<S, M>(
    table: &TrackTable,
    store: &S,
    mapper: &M,
    config: &ExportConfig,
    writer: &mut dyn Write,
) -> Result<ExportSummary>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
{
    let mut summary = ExportSummary::default();

    // Header
    if config.timestamp_header {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        writeln!(writer, "# from project {} at {now}", config.provenance)?;
    } else {
        writeln!(writer, "# from project {}", config.provenance)?;
    }
    writeln!(
        writer,
        "# {}",
        ["TIME", "X", "Y", "Z", "TRACK_ID", "PARENT_TRACK_ID", "SPOT LABEL"].join(DELIM)
    )?;
    writeln!(writer)?;

    for tree in table.forest.trees() {
        // first, the complete tree
        writeln!(writer, "# one tree of tracks:")?;
        writeln!(writer, "{}", manifest_line(tree))?;
        summary.trees += 1;

        // second, every track of the tree separately
        for id in tree {
            let Some(segment) = table.segment(*id) else {
                warn!(track = %id, "tree lists a track that is not in the table");
                continue;
            };
            for spot_id in &segment.spots {
                let Some(spot) = store.spot(*spot_id) else {
                    warn!(spot = %spot_id, track = %id, "spot vanished from the store");
                    continue;
                };
                let [x, y, z] = mapper.to_image(spot.position);
                writeln!(
                    writer,
                    "{}{DELIM}{x}{DELIM}{y}{DELIM}{z}{DELIM}{}{DELIM}{}{DELIM}{}",
                    spot.time, segment.id, segment.parent, row_label(&spot.label)
                )?;
                summary.spots += 1;
            }
            writeln!(writer)?;
            writeln!(writer)?;
            summary.segments += 1;
        }
    }

    Ok(summary)
}

/// Labels go out as the last column of a single row: delimiters and line
/// breaks inside them become spaces.
fn row_label(label: &str) -> Cow<'_, str> {
    if label.contains(['\t', '\n', '\r']) {
        Cow::Owned(label.replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(label)
    }
}

/// `#\t<id1>\t<id2>...`
fn manifest_line(tree: &[TrackId]) -> String {
    let mut line = String::from("#");
    for id in tree {
        line.push_str(DELIM);
        line.push_str(&id.to_string());
    }
    line
}
