//! End-to-end point-cloud import and export through real files.

use lineage_tracks::points::{
    export_points_file, export_points_per_timepoint, import_points, import_points_file,
};
use lineage_tracks::storage::LineageStore;
use lineage_tracks::{
    AffineTransform3D, Direction, Error, IdentityMapper, Placement, PointExportConfig, PointFormat,
    PointImportConfig, PointSummary, SharedGraph, Shape, Spot, TimeWindow,
};
use pretty_assertions::assert_eq;

fn replicate(from: i32, till: i32) -> PointImportConfig {
    PointImportConfig {
        window: TimeWindow::new(from, till).unwrap(),
        placement: Placement::AllTimepoints,
        ..Default::default()
    }
}

// ============================================================================
// 1. 3-column import
// ============================================================================

#[test]
fn test_replicated_row_forms_one_chain() {
    let graph = SharedGraph::open_memory();
    let summary = import_points(&graph, &IdentityMapper, &replicate(0, 5), PointFormat::ThreeColumn, "4 5 6\n".as_bytes())
        .unwrap();
    assert_eq!(summary, PointSummary { spots: 6, links: 5, files: 0 });

    let store = graph.read();
    for t in 0..=5 {
        let at = store.spots_at(t);
        assert_eq!(at.len(), 1);
        let spot = store.spot(at[0]).unwrap();
        assert_eq!(spot.position, [4.0, 5.0, 6.0]);
        assert_eq!(spot.shape, Shape::covariance_from_radius(10.0));
        // every spot but the last has one later-time link
        let outgoing = store.links_of(at[0], Direction::Outgoing).len();
        assert_eq!(outgoing, usize::from(t < 5));
    }
}

#[test]
fn test_single_timepoint_rows_are_isolated() {
    let graph = SharedGraph::open_memory();
    let config = PointImportConfig {
        window: TimeWindow::new(0, 9).unwrap(),
        placement: Placement::SingleTimepoint(3),
        radius: 2.5,
    };
    let text = "# x y z\n1\t1\t1\n\n2\t2\t2\n3 3 3\n";
    let summary = import_points(&graph, &IdentityMapper, &config, PointFormat::ThreeColumn, text.as_bytes()).unwrap();
    assert_eq!(summary.spots, 3);

    let store = graph.read();
    assert_eq!(store.spots_at(3).len(), 3);
    assert_eq!(store.link_count(), 0);
    let first = store.spot(store.spots_at(3)[0]).unwrap();
    assert!((first.shape.bounding_radius() - 2.5).abs() < 1e-12);
}

#[test]
fn test_points_are_mapped_to_world() {
    let graph = SharedGraph::open_memory();
    let mapper = AffineTransform3D::scale_translate([2.0, 2.0, 0.5], [0.0, 0.0, 0.0]).unwrap();
    let config = PointImportConfig { placement: Placement::SingleTimepoint(0), ..Default::default() };
    import_points(&graph, &mapper, &config, PointFormat::ThreeColumn, "1\t2\t8\n".as_bytes()).unwrap();

    let store = graph.read();
    assert_eq!(store.spot(store.spots_at(0)[0]).unwrap().position, [2.0, 4.0, 4.0]);
}

// ============================================================================
// 2. 4-column import
// ============================================================================

#[test]
fn test_four_column_file_keeps_own_times() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.txt");
    std::fs::write(&path, "0 0 0 2\n1 1 1 2\n5 5 5 7\n").unwrap();

    let graph = SharedGraph::open_memory();
    let summary = import_points_file(&graph, &IdentityMapper, &PointImportConfig::default(), PointFormat::FourColumn, &path)
        .unwrap();
    assert_eq!(summary.spots, 3);

    let store = graph.read();
    assert_eq!(store.spots_at(2).len(), 2);
    assert_eq!(store.spots_at(7).len(), 1);
    assert_eq!(store.link_count(), 0);
}

#[test]
fn test_wrong_column_count_is_malformed() {
    let graph = SharedGraph::open_memory();
    let err = import_points(&graph, &IdentityMapper, &PointImportConfig::default(), PointFormat::FourColumn, "1 2 3\n".as_bytes())
        .unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { line: 1, .. }));
    assert_eq!(graph.read().spot_count(), 0);
}

// ============================================================================
// 3. Export
// ============================================================================

#[test]
fn test_per_timepoint_export_writes_every_file() {
    let graph = SharedGraph::open_memory();
    {
        let mut store = graph.lock();
        store.add_spot(Spot::new(0, [1.0, 2.0, 3.0]));
        store.add_spot(Spot::new(0, [4.0, 5.0, 6.0]));
        store.add_spot(Spot::new(2, [7.0, 8.0, 9.0]));
    }

    let dir = tempfile::tempdir().unwrap();
    let config = PointExportConfig::new(TimeWindow::new(0, 2).unwrap());
    let (summary, paths) = export_points_per_timepoint(&graph, &IdentityMapper, &config, dir.path()).unwrap();
    assert_eq!(summary, PointSummary { spots: 3, links: 0, files: 3 });

    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["pointCloud_t0000.txt", "pointCloud_t0001.txt", "pointCloud_t0002.txt"]);

    assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "1\t2\t3\n4\t5\t6\n");
    assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "");
    assert_eq!(std::fs::read_to_string(&paths[2]).unwrap(), "7\t8\t9\n");
}

#[test]
fn test_per_timepoint_export_rejects_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let graph = SharedGraph::open_memory();
    let config = PointExportConfig::new(TimeWindow::at(0));
    let err = export_points_per_timepoint(&graph, &IdentityMapper, &config, dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn test_bad_pattern_creates_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let graph = SharedGraph::open_memory();
    let config = PointExportConfig {
        window: TimeWindow::new(0, 1).unwrap(),
        file_name_pattern: "cloud.txt".into(),
    };
    assert!(export_points_per_timepoint(&graph, &IdentityMapper, &config, dir.path()).is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_four_column_export_then_import() {
    let graph = SharedGraph::open_memory();
    {
        let mut store = graph.lock();
        for t in 0..4 {
            store.add_spot(Spot::new(t, [t as f64, 0.5, -1.0]));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all.txt");
    let config = PointExportConfig::new(TimeWindow::new(1, 3).unwrap());
    let summary = export_points_file(&graph, &IdentityMapper, &config, &path).unwrap();
    assert_eq!(summary, PointSummary { spots: 3, links: 0, files: 1 });

    let copy = SharedGraph::open_memory();
    import_points_file(&copy, &IdentityMapper, &PointImportConfig::default(), PointFormat::FourColumn, &path).unwrap();
    let store = copy.read();
    assert_eq!(store.spot_count(), 3);
    assert_eq!(store.time_span(), Some(TimeWindow::new(1, 3).unwrap()));
}

// ============================================================================
// 4. Validation and file errors
// ============================================================================

#[test]
fn test_reversed_window_is_rejected() {
    let graph = SharedGraph::open_memory();
    let config = PointImportConfig {
        window: TimeWindow { from: 5, till: 1 },
        placement: Placement::AllTimepoints,
        ..Default::default()
    };
    let err = import_points(&graph, &IdentityMapper, &config, PointFormat::ThreeColumn, "1 2 3\n".as_bytes()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(graph.read().spot_count(), 0);

    let dir = tempfile::tempdir().unwrap();
    let export = PointExportConfig::new(TimeWindow { from: 3, till: 0 });
    assert!(matches!(
        export_points_per_timepoint(&graph, &IdentityMapper, &export, dir.path()),
        Err(Error::InvalidConfig(_))
    ));
    let path = dir.path().join("all.txt");
    assert!(export_points_file(&graph, &IdentityMapper, &export, &path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_file_errors_name_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let graph = SharedGraph::open_memory();

    let missing = dir.path().join("cloud.txt");
    let err = import_points_file(&graph, &IdentityMapper, &PointImportConfig::default(), PointFormat::ThreeColumn, &missing)
        .unwrap_err();
    assert!(matches!(&err, Error::File { path, .. } if path == &missing));

    let target = dir.path().join("absent").join("all.txt");
    let err = export_points_file(&graph, &IdentityMapper, &PointExportConfig::default(), &target).unwrap_err();
    assert!(matches!(&err, Error::File { path, .. } if path == &target));
    assert!(err.to_string().contains("all.txt"));
}

#[test]
fn test_non_utf8_points_file_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.txt");
    std::fs::write(&path, b"1 2 3 0\n4 5 \xff 1\n").unwrap();

    let graph = SharedGraph::open_memory();
    let err = import_points_file(&graph, &IdentityMapper, &PointImportConfig::default(), PointFormat::FourColumn, &path)
        .unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { line: 2, .. }));
    assert_eq!(graph.read().spot_count(), 0);
}
