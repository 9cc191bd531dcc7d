//! # Point-Cloud Import/Export
//!
//! Plain coordinate lists without lineage semantics.
//!
//! | Format | Columns | Import | Export |
//! |--------|---------|--------|--------|
//! | 3-column | `x y z` | one timepoint, or replicated over the window | one file per timepoint |
//! | 4-column | `x y z t` | every row at its own time, never linked | one combined file |
//!
//! Coordinates in the files are image space; the mapper converts them.

pub mod reader;
pub mod writer;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{PointExportConfig, PointImportConfig};
use crate::storage::{LineageStore, SharedGraph};
use crate::transform::CoordinateMapper;
use crate::{Error, Result};

pub use reader::{import_four_column, import_three_column, parse_point_line, PointRecord};
pub use writer::{export_four_column, export_three_column, write_timepoint};

/// Counts of one point-cloud import or export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSummary {
    pub spots: usize,
    pub links: usize,
    pub files: usize,
}

/// Point-cloud file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointFormat {
    ThreeColumn,
    FourColumn,
}

// ============================================================================
// Lock-holding entry points
// ============================================================================

/// Import points from a stream under the graph's exclusive lock.
pub fn import_points<S, M, R>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &PointImportConfig,
    format: PointFormat,
    reader: R,
) -> Result<PointSummary>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
    R: BufRead,
{
    let mut store = graph.lock();
    let summary = match format {
        PointFormat::ThreeColumn => import_three_column(&mut *store, mapper, config, reader)?,
        PointFormat::FourColumn => import_four_column(&mut *store, mapper, config, reader)?,
    };
    info!(spots = summary.spots, links = summary.links, ?format, "imported point cloud");
    Ok(summary)
}

/// [`import_points`] from a file.
pub fn import_points_file<S, M>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &PointImportConfig,
    format: PointFormat,
    path: impl AsRef<Path>,
) -> Result<PointSummary>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
{
    let path = path.as_ref();
    config.validate()?;
    let file = File::open(path).map_err(|e| Error::file(path, e))?;
    import_points(graph, mapper, config, format, BufReader::new(file)).map_err(|e| e.in_file(path))
}

/// Export one 3-column file per timepoint into `dir`.
pub fn export_points_per_timepoint<S, M>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &PointExportConfig,
    dir: impl AsRef<Path>,
) -> Result<(PointSummary, Vec<PathBuf>)>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
{
    let store = graph.lock();
    let result = export_three_column(&*store, mapper, config, dir.as_ref())?;
    info!(spots = result.0.spots, files = result.0.files, "exported per-timepoint point clouds");
    Ok(result)
}

/// Export all spots of the window as one 4-column file.
pub fn export_points_file<S, M>(
    graph: &SharedGraph<S>,
    mapper: &M,
    config: &PointExportConfig,
    path: impl AsRef<Path>,
) -> Result<PointSummary>
where
    S: LineageStore,
    M: CoordinateMapper + ?Sized,
{
    let path = path.as_ref();
    config.validate()?;
    let store = graph.lock();
    let file = File::create(path).map_err(|e| Error::file(path, e))?;
    let mut out = BufWriter::new(file);
    let mut summary = export_four_column(&*store, mapper, config, &mut out).map_err(|e| e.in_file(path))?;
    out.flush().map_err(|e| Error::file(path, e))?;
    summary.files = 1;
    info!(spots = summary.spots, "exported 4-column point cloud");
    Ok(summary)
}
