//! Point-cloud text → spots.

use std::io::BufRead;

use tracing::debug;

use crate::config::{Placement, PointImportConfig};
use crate::lines::for_each_line;
use crate::model::{Shape, Spot, SpotId};
use crate::storage::LineageStore;
use crate::transform::CoordinateMapper;
use crate::{Error, Result};
use super::PointSummary;

/// One parsed point row, image-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub position: [f64; 3],
    /// Present only in the 4-column format.
    pub time: Option<i32>,
}

/// Parse one row with exactly `columns` (3 or 4) tab- or space-separated fields.
/// Blank and `#` lines yield `Ok(None)`.
pub fn parse_point_line(line: &str, columns: usize) -> std::result::Result<Option<PointRecord>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split(['\t', ' ']).filter(|f| !f.is_empty()).collect();
    if fields.len() != columns {
        return Err(format!("expected {columns} columns, found {}", fields.len()));
    }

    let coord = |i: usize| -> std::result::Result<f64, String> {
        fields[i].parse().map_err(|e| format!("failed parsing coordinate {:?}: {e}", fields[i]))
    };
    let position = [coord(0)?, coord(1)?, coord(2)?];
    let time = if columns == 4 {
        Some(fields[3].parse().map_err(|e| format!("failed parsing time {:?}: {e}", fields[3]))?)
    } else {
        None
    };
    Ok(Some(PointRecord { position, time }))
}

fn read_records<R: BufRead>(reader: R, columns: usize) -> Result<Vec<PointRecord>> {
    let mut records = Vec::new();
    for_each_line(reader, |line_no, line| match parse_point_line(&line, columns) {
        Ok(Some(record)) => {
            records.push(record);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(reason) => Err(Error::MalformedRecord { line: line_no, content: line, reason }),
    })?;
    Ok(records)
}

/// Import `x y z` rows according to `config.placement`.
///
/// `SingleTimepoint(t)` adds one isolated spot per row at `t` (clamped into
/// the window). `AllTimepoints` adds a chain of spots per row, one per
/// timepoint of the window, each linked to the next.
///
/// The whole input is parsed before the store is touched, so a malformed
/// row leaves the store unchanged.
pub fn import_three_column<S, M, R>(
    store: &mut S,
    mapper: &M,
    config: &PointImportConfig,
    reader: R,
) -> Result<PointSummary>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
    R: BufRead,
{
    config.validate()?;
    let records = read_records(reader, 3)?;
    let shape = Shape::covariance_from_radius(config.radius);
    let mut summary = PointSummary::default();

    for record in records {
        let position = mapper.to_world(record.position);
        match config.placement {
            Placement::SingleTimepoint(t) => {
                store.add_spot(Spot::new(config.window.clamp(t), position).with_shape(shape));
                summary.spots += 1;
            }
            Placement::AllTimepoints => {
                let mut previous: Option<SpotId> = None;
                for t in config.window.timepoints() {
                    let id = store.add_spot(Spot::new(t, position).with_shape(shape));
                    summary.spots += 1;
                    if let Some(prev) = previous {
                        store.add_link(prev, id)?;
                        summary.links += 1;
                    }
                    previous = Some(id);
                }
            }
        }
    }
    debug!(spots = summary.spots, links = summary.links, placement = ?config.placement, "imported 3-column points");
    Ok(summary)
}

/// Import `x y z t` rows; every row is an isolated spot at its own time.
pub fn import_four_column<S, M, R>(
    store: &mut S,
    mapper: &M,
    config: &PointImportConfig,
    reader: R,
) -> Result<PointSummary>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
    R: BufRead,
{
    config.validate()?;
    let records = read_records(reader, 4)?;
    let shape = Shape::covariance_from_radius(config.radius);
    let mut summary = PointSummary::default();

    for record in records {
        let time = record.time.unwrap_or(config.window.from);
        store.add_spot(Spot::new(time, mapper.to_world(record.position)).with_shape(shape));
        summary.spots += 1;
    }
    debug!(spots = summary.spots, "imported 4-column points");
    Ok(summary)
}
