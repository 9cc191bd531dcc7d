//! Text → lineage graph.
//!
//! Lines are applied to the store in file order. A track's first line links
//! to the last spot of its parent track if that track was already seen;
//! otherwise the link is deferred until the whole input has been read.

use std::io::BufRead;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::ImportConfig;
use crate::lines::for_each_line;
use crate::model::{Shape, Spot, SpotId, TrackId};
use crate::storage::LineageStore;
use crate::transform::CoordinateMapper;
use crate::{Error, Result};
use super::writer::DELIM;
use super::Anomaly;

// ============================================================================
// Line parsing
// ============================================================================

const MAX_TRACK_ID: i64 = u32::MAX as i64;

/// One data row of the track table, coordinates still in image space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub time: i32,
    pub position: [f64; 3],
    pub track: TrackId,
    pub parent: TrackId,
    pub label: String,
    pub radius: Option<f64>,
}

/// Outcome of parsing one line that is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Blank or comment line.
    Skip,
    Record(TrackRecord),
}

/// Parse one line. The error is a human-readable reason; the caller adds
/// the line number and raw content.
pub fn parse_line(line: &str) -> std::result::Result<ParsedLine, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(ParsedLine::Skip);
    }

    let fields: Vec<&str> = line.split(DELIM).collect();
    if fields.len() < 7 {
        return Err(format!("expected at least 7 tab-separated fields, found {}", fields.len()));
    }

    // A numeric 8th-or-later field is the radius; anything else is label text.
    let last = fields.len() - 1;
    let radius = if last >= 7 {
        fields[last].trim().parse::<f64>().ok().filter(|r| r.is_finite())
    } else {
        None
    };
    let label_end = if radius.is_some() { last } else { fields.len() };
    let label = fields[6..label_end].join(DELIM);

    let track = match parse_num::<i64>(fields[4], "track id")? {
        id @ 1..=MAX_TRACK_ID => TrackId(id as u32),
        id => return Err(format!("track id must be between 1 and {MAX_TRACK_ID}, found {id}")),
    };
    // non-positive parents mean "no parent"
    let parent = match parse_num::<i64>(fields[5], "parent track id")? {
        id if id <= 0 => TrackId::ROOT,
        id @ 1..=MAX_TRACK_ID => TrackId(id as u32),
        id => return Err(format!("parent track id {id} exceeds {MAX_TRACK_ID}")),
    };
    if parent == track {
        return Err(format!("track {track} names itself as parent"));
    }

    Ok(ParsedLine::Record(TrackRecord {
        time: parse_num(fields[0], "time")?,
        position: [
            parse_num(fields[1], "x")?,
            parse_num(fields[2], "y")?,
            parse_num(fields[3], "z")?,
        ],
        track,
        parent,
        label,
        radius,
    }))
}

fn parse_num<T: std::str::FromStr>(field: &str, what: &str) -> std::result::Result<T, String>
where
    T::Err: std::fmt::Display,
{
    field
        .trim()
        .parse()
        .map_err(|e| format!("failed parsing {what} {field:?}: {e}"))
}

// ============================================================================
// Import state
// ============================================================================

/// Counts and anomalies of one import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub spots: usize,
    pub links: usize,
    /// Distinct track ids seen.
    pub tracks: usize,
    /// Parent links that had to wait for the end of input.
    pub deferred_resolved: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Incremental track table importer.
///
/// Feed it records with [`apply`](Self::apply), then call
/// [`finish`](Self::finish) to resolve parent links that pointed forward.
pub struct TrackTableReader<'m, M: CoordinateMapper + ?Sized> {
    mapper: &'m M,
    config: ImportConfig,
    first_spot: HashMap<TrackId, SpotId>,
    last_spot: HashMap<TrackId, SpotId>,
    /// child track → parent track, in discovery order
    deferred: Vec<(TrackId, TrackId)>,
    summary: ImportSummary,
}

impl<'m, M: CoordinateMapper + ?Sized> TrackTableReader<'m, M> {
    pub fn new(mapper: &'m M, config: ImportConfig) -> Self {
        Self {
            mapper,
            config,
            first_spot: HashMap::new(),
            last_spot: HashMap::new(),
            deferred: Vec::new(),
            summary: ImportSummary::default(),
        }
    }

    /// Add the record's spot and whatever link it implies.
    pub fn apply<S: LineageStore + ?Sized>(&mut self, store: &mut S, record: TrackRecord) -> Result<SpotId> {
        let radius = match record.radius {
            Some(r) if self.config.prefer_radius_column => r,
            _ => self.config.default_radius,
        };
        let spot = Spot::new(record.time, self.mapper.to_world(record.position))
            .with_shape(Shape::sphere(radius))
            .with_label(record.label);
        let id = store.add_spot(spot);
        self.summary.spots += 1;

        match self.last_spot.get(&record.track).copied() {
            None => {
                // starting a new track
                self.first_spot.insert(record.track, id);
                self.last_spot.insert(record.track, id);
                self.summary.tracks += 1;
                debug!(track = %record.track, time = record.time, "introducing a new track");

                if !record.parent.is_root() {
                    match self.last_spot.get(&record.parent).copied() {
                        Some(parent_last) => {
                            store.add_link(parent_last, id)?;
                            self.summary.links += 1;
                            debug!(track = %record.track, parent = %record.parent, "linked to parent track");
                        }
                        None => {
                            self.deferred.push((record.track, record.parent));
                            debug!(track = %record.track, parent = %record.parent, "parent track not seen yet");
                        }
                    }
                }
            }
            Some(prev) => {
                // prolonging an already started track
                store.add_link(prev, id)?;
                self.summary.links += 1;
                self.last_spot.insert(record.track, id);
            }
        }
        Ok(id)
    }

    /// Resolve deferred parent links.
    ///
    /// A link whose parent track never appeared, or which the store refuses,
    /// is dropped and recorded as an anomaly; the rest are still resolved.
    pub fn finish<S: LineageStore + ?Sized>(mut self, store: &mut S) -> Result<ImportSummary> {
        for (track, parent) in std::mem::take(&mut self.deferred) {
            let (Some(child_first), Some(parent_last)) =
                (self.first_spot.get(&track).copied(), self.last_spot.get(&parent).copied())
            else {
                let anomaly = Anomaly::UnresolvedParentReference { track, parent };
                error!("{anomaly}");
                self.summary.anomalies.push(anomaly);
                continue;
            };
            match store.add_link(parent_last, child_first) {
                Ok(_) => {
                    self.summary.links += 1;
                    self.summary.deferred_resolved += 1;
                    debug!(track = %track, parent = %parent, "added deferred link to parent track");
                }
                Err(Error::InvalidLink(reason) | Error::NotFound(reason)) => {
                    let anomaly = Anomaly::RejectedParentLink { track, parent, reason };
                    error!("{anomaly}");
                    self.summary.anomalies.push(anomaly);
                }
                Err(other) => return Err(other),
            }
        }
        Ok(self.summary)
    }
}

/// Parse a whole track table into `store`.
///
/// The first malformed line aborts the import with [`Error::MalformedRecord`];
/// spots added from earlier lines stay and deferred links are not resolved.
pub fn read_track_table<S, M, R>(
    store: &mut S,
    mapper: &M,
    config: &ImportConfig,
    reader: R,
) -> Result<ImportSummary>
where
    S: LineageStore + ?Sized,
    M: CoordinateMapper + ?Sized,
    R: BufRead,
{
    config.validate()?;
    let mut importer = TrackTableReader::new(mapper, *config);

    for_each_line(reader, |line_no, line| {
        let malformed = |reason: String| Error::MalformedRecord {
            line: line_no,
            content: line.clone(),
            reason,
        };

        match parse_line(&line).map_err(&malformed)? {
            ParsedLine::Skip => Ok(()),
            ParsedLine::Record(record) => {
                importer.apply(store, record).map(|_| ()).map_err(|e| match e {
                    Error::InvalidLink(reason) | Error::NotFound(reason) => malformed(reason),
                    other => other,
                })
            }
        }
    })?;

    importer.finish(store)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;
    use crate::storage::MemoryStore;
    use crate::transform::IdentityMapper;
    use pretty_assertions::assert_eq;

    fn import(text: &str) -> (MemoryStore, Result<ImportSummary>) {
        let mut db = MemoryStore::new();
        let result = read_track_table(&mut db, &IdentityMapper, &ImportConfig::default(), text.as_bytes());
        (db, result)
    }

    #[test]
    fn test_parse_skip_lines() {
        assert_eq!(parse_line(""), Ok(ParsedLine::Skip));
        assert_eq!(parse_line("   "), Ok(ParsedLine::Skip));
        assert_eq!(parse_line("#\t1\t2"), Ok(ParsedLine::Skip));
    }

    #[test]
    fn test_parse_record_with_radius() {
        let ParsedLine::Record(r) = parse_line("3\t1.5\t2\t-4\t7\t2\tcell\t5.0\r").unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(r, TrackRecord {
            time: 3,
            position: [1.5, 2.0, -4.0],
            track: TrackId(7),
            parent: TrackId(2),
            label: "cell".into(),
            radius: Some(5.0),
        });
    }

    #[test]
    fn test_parse_label_with_tabs() {
        let ParsedLine::Record(r) = parse_line("0\t0\t0\t0\t1\t0\tleft\tdaughter\t2.5").unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(r.label, "left\tdaughter");
        assert_eq!(r.radius, Some(2.5));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("0\t1\t2\t3\t1\t0").is_err());
        assert!(parse_line("x\t1\t2\t3\t1\t0\tl").is_err());
        assert!(parse_line("0\t1\t2\t3\t-1\t0\tl").is_err());
        assert!(parse_line("0\t1\t2\t3\t0\t0\tl").is_err());
        assert!(parse_line("0\t1\t2\t3\t1\t99999999999\tl").is_err());
        assert!(parse_line("0\t1\t2\t3\t4\t4\tl").is_err());
    }

    #[test]
    fn test_parse_non_numeric_tail_is_label() {
        let ParsedLine::Record(r) = parse_line("0\t1\t2\t3\t1\t0\tleft\tdaughter").unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(r.label, "left\tdaughter");
        assert_eq!(r.radius, None);

        let ParsedLine::Record(r) = parse_line("0\t1\t2\t3\t1\t0\tl\tNaN").unwrap() else {
            panic!("expected a record");
        };
        assert_eq!((r.label.as_str(), r.radius), ("l\tNaN", None));
    }

    #[test]
    fn test_parse_non_positive_parent_is_root() {
        for parent in ["0", "-1", "-42"] {
            let line = format!("0\t1\t2\t3\t5\t{parent}\tl");
            let ParsedLine::Record(r) = parse_line(&line).unwrap() else {
                panic!("expected a record");
            };
            assert_eq!(r.parent, TrackId::ROOT);
        }
    }

    #[test]
    fn test_radius_override_and_default() {
        let (db, result) = import("0\t1\t2\t3\t1\t0\tlblA\t5.0\n1\t1\t2\t3\t1\t0\tlblB\n");
        let summary = result.unwrap();
        assert_eq!(summary.spots, 2);
        assert_eq!(summary.links, 1);

        let first = db.spot(SpotId(1)).unwrap();
        let second = db.spot(SpotId(2)).unwrap();
        assert_eq!(first.shape, Shape::Sphere { radius: 5.0 });
        assert_eq!(first.label, "lblA");
        assert_eq!(second.shape, Shape::Sphere { radius: 10.0 });
    }

    #[test]
    fn test_radius_column_ignored_when_not_preferred() {
        let mut db = MemoryStore::new();
        let config = ImportConfig { prefer_radius_column: false, default_radius: 3.0 };
        read_track_table(&mut db, &IdentityMapper, &config, "0\t1\t2\t3\t1\t0\tl\t5.0\n".as_bytes()).unwrap();
        assert_eq!(db.spot(SpotId(1)).unwrap().shape, Shape::Sphere { radius: 3.0 });
    }

    #[test]
    fn test_parent_link_immediate() {
        let (db, result) = import("0\t0\t0\t0\t1\t0\tm\n1\t0\t0\t0\t1\t0\tm\n2\t0\t0\t0\t2\t1\td\n");
        let summary = result.unwrap();
        assert_eq!(summary.links, 2);
        assert_eq!(summary.deferred_resolved, 0);

        let incoming = db.links_of(SpotId(3), Direction::Incoming);
        assert_eq!(db.link(incoming[0]).unwrap().source, SpotId(2));
    }

    #[test]
    fn test_parent_link_deferred() {
        let (db, result) = import("2\t0\t0\t0\t2\t1\td\n0\t0\t0\t0\t1\t0\tm\n1\t0\t0\t0\t1\t0\tm\n");
        let summary = result.unwrap();
        assert_eq!(summary.deferred_resolved, 1);
        assert_eq!(summary.links, 2);

        // child's first spot hangs off the parent's LAST spot
        let incoming = db.links_of(SpotId(1), Direction::Incoming);
        assert_eq!(incoming.len(), 1);
        assert_eq!(db.link(incoming[0]).unwrap().source, SpotId(3));
    }

    #[test]
    fn test_unresolved_parent_is_dropped() {
        let (db, result) = import("0\t0\t0\t0\t5\t9\torphan\n");
        let summary = result.unwrap();
        assert_eq!(summary.links, 0);
        assert_eq!(summary.anomalies, vec![Anomaly::UnresolvedParentReference {
            track: TrackId(5),
            parent: TrackId(9),
        }]);
        assert_eq!(db.spot_count(), 1);
    }

    #[test]
    fn test_malformed_line_keeps_earlier_spots() {
        let (db, result) = import("# header\n0\t0\t0\t0\t1\t0\ta\n1\t0\t0\n2\t0\t0\t0\t1\t0\ta\n");
        match result {
            Err(Error::MalformedRecord { line, content, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(content, "1\t0\t0");
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
        assert_eq!(db.spot_count(), 1);
    }

    #[test]
    fn test_rejected_deferred_link_does_not_stop_the_rest() {
        // tracks 2 and 3 both come before their parent; track 2 starts at the
        // parent's last timepoint and cannot be linked
        let text = "1\t0\t0\t0\t2\t1\tbad\n2\t0\t0\t0\t3\t1\tgood\n0\t0\t0\t0\t1\t0\tm\n1\t0\t0\t0\t1\t0\tm\n";
        let (db, result) = import(text);
        let summary = result.unwrap();
        assert_eq!(summary.deferred_resolved, 1);
        assert_eq!(summary.links, 2);
        assert!(matches!(
            summary.anomalies.as_slice(),
            [Anomaly::RejectedParentLink { track: TrackId(2), parent: TrackId(1), .. }]
        ));

        let incoming = db.links_of(SpotId(2), Direction::Incoming);
        assert_eq!(db.link(incoming[0]).unwrap().source, SpotId(4));
        assert!(db.links_of(SpotId(1), Direction::Incoming).is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_malformed_with_line() {
        let mut bytes = b"0\t0\t0\t0\t1\t0\ta\n1\t0\t0\t0\t1\t0\t".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let mut db = MemoryStore::new();
        let err = read_track_table(&mut db, &IdentityMapper, &ImportConfig::default(), bytes.as_slice()).unwrap_err();
        match err {
            Error::MalformedRecord { line, content, .. } => {
                assert_eq!(line, 2);
                assert!(content.starts_with("1\t0\t0\t0\t1\t0\t"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
        assert_eq!(db.spot_count(), 1);
    }

    #[test]
    fn test_same_time_prolongation_is_malformed() {
        let (_, result) = import("0\t0\t0\t0\t1\t0\ta\n0\t1\t0\t0\t1\t0\ta\n");
        assert!(matches!(result, Err(Error::MalformedRecord { line: 2, .. })));
    }
}
