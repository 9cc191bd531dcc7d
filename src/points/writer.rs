//! Spots → point-cloud text.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::PointExportConfig;
use crate::model::SpotId;
use crate::storage::LineageStore;
use crate::transform::CoordinateMapper;
use crate::{Error, Result};
use super::PointSummary;

fn write_row<S, M>(
    store: &S,
    mapper: &M,
    spot: SpotId,
    with_time: bool,
    writer: &mut dyn Write,
) -> Result<bool>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
{
    let Some(spot) = store.spot(spot) else { return Ok(false) };
    let [x, y, z] = mapper.to_image(spot.position);
    if with_time {
        writeln!(writer, "{x}\t{y}\t{z}\t{}", spot.time)?;
    } else {
        writeln!(writer, "{x}\t{y}\t{z}")?;
    }
    Ok(true)
}

/// Write the spots of one timepoint as `x y z` rows.
pub fn write_timepoint<S, M>(
    store: &S,
    mapper: &M,
    time: i32,
    writer: &mut dyn Write,
) -> Result<usize>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
{
    let mut written = 0;
    for spot in store.spots_at(time) {
        if write_row(store, mapper, spot, false, writer)? {
            written += 1;
        }
    }
    Ok(written)
}

/// Write one `x y z` file per timepoint of the window into `dir`, named by
/// the config's file-name pattern. Empty timepoints still get a file.
pub fn export_three_column<S, M>(
    store: &S,
    mapper: &M,
    config: &PointExportConfig,
    dir: &Path,
) -> Result<(PointSummary, Vec<PathBuf>)>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
{
    config.validate()?;
    if !dir.is_dir() {
        return Err(Error::InvalidConfig(format!("{} is not a directory", dir.display())));
    }
    // expand every name first so a bad pattern fails before any file exists
    let names = config
        .window
        .timepoints()
        .map(|t| config.file_name(t).map(|name| (t, dir.join(name))))
        .collect::<Result<Vec<_>>>()?;

    let mut summary = PointSummary::default();
    let mut paths = Vec::with_capacity(names.len());
    for (time, path) in names {
        let file = File::create(&path).map_err(|e| Error::file(&path, e))?;
        let mut out = BufWriter::new(file);
        summary.spots += write_timepoint(store, mapper, time, &mut out).map_err(|e| e.in_file(&path))?;
        out.flush().map_err(|e| Error::file(&path, e))?;
        summary.files += 1;
        paths.push(path);
    }
    Ok((summary, paths))
}

/// Write every spot of the window as `x y z t` rows into one stream.
pub fn export_four_column<S, M>(
    store: &S,
    mapper: &M,
    config: &PointExportConfig,
    writer: &mut dyn Write,
) -> Result<PointSummary>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
{
    config.validate()?;
    let mut summary = PointSummary::default();
    for spot in store.spots_in(config.window) {
        if write_row(store, mapper, spot, true, writer)? {
            summary.spots += 1;
        }
    }
    Ok(summary)
}
