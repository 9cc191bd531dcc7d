//! Configuration and report values persisted as JSON by a host application.

use lineage_tracks::config::format_timepoint;
use lineage_tracks::{
    AffineTransform3D, Anomaly, ExportConfig, ImportConfig, Placement, PointExportConfig,
    PointImportConfig, SpotId, TimeWindow, TrackId,
};
use pretty_assertions::assert_eq;

#[test]
fn test_export_config_json() {
    let config = ExportConfig::new(TimeWindow::new(2, 40).unwrap()).with_provenance("/data/embryo");
    let json = serde_json::to_string(&config).unwrap();
    let back: ExportConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_missing_fields_take_defaults() {
    let config: ExportConfig = serde_json::from_str(r#"{"window":{"from":0,"till":9}}"#).unwrap();
    assert_eq!(config.provenance, "unknown");
    assert!(config.split_on_gaps);
    assert!(!config.timestamp_header);

    let import: ImportConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(import, ImportConfig::default());

    let points: PointExportConfig = serde_json::from_str(r#"{"window":{"from":1,"till":1}}"#).unwrap();
    assert_eq!(points.file_name(1).unwrap(), "pointCloud_t0001.txt");
}

#[test]
fn test_point_import_config_json() {
    let config = PointImportConfig {
        window: TimeWindow::new(0, 5).unwrap(),
        placement: Placement::AllTimepoints,
        radius: 4.0,
    };
    let value = serde_json::to_value(config).unwrap();
    assert_eq!(value["placement"], serde_json::json!("AllTimepoints"));
    let back: PointImportConfig = serde_json::from_value(value).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_anomaly_json() {
    let anomaly = Anomaly::UnresolvedParentReference { track: TrackId(3), parent: TrackId(9) };
    let json = serde_json::to_value(&anomaly).unwrap();
    assert_eq!(json, serde_json::json!({ "UnresolvedParentReference": { "track": 3, "parent": 9 } }));

    let merge = Anomaly::MergeTopologyViolation {
        spot: SpotId(4),
        time: 1,
        label: "c".into(),
        ignored_source: SpotId(2),
        incoming: 2,
    };
    let back: Anomaly = serde_json::from_str(&serde_json::to_string(&merge).unwrap()).unwrap();
    assert_eq!(back, merge);
}

#[test]
fn test_transform_json() {
    let mapper = AffineTransform3D::scale_translate([0.5, 0.5, 2.0], [0.0, 1.0, 0.0]).unwrap();
    let back: AffineTransform3D = serde_json::from_str(&serde_json::to_string(&mapper).unwrap()).unwrap();
    assert_eq!(back, mapper);
}

#[test]
fn test_file_name_patterns() {
    assert_eq!(format_timepoint("t%d.txt", 7).unwrap(), "t7.txt");
    assert_eq!(format_timepoint("t%03d.txt", 7).unwrap(), "t007.txt");
    assert_eq!(format_timepoint("100%%_t%d", 2).unwrap(), "100%_t2");
    assert!(format_timepoint("plain.txt", 1).is_err());
    assert!(format_timepoint("%d_%d", 1).is_err());
    assert!(format_timepoint("%s", 1).is_err());
}

#[test]
fn test_inverted_window_is_rejected() {
    assert!(TimeWindow::new(5, 4).is_err());
    assert_eq!(TimeWindow::new(3, 3).unwrap().len(), 1);
}

#[test]
fn test_reversed_window_json_is_rejected() {
    assert!(serde_json::from_str::<TimeWindow>(r#"{"from":5,"till":1}"#).is_err());
    let err = serde_json::from_str::<PointImportConfig>(
        r#"{"window":{"from":5,"till":1},"placement":"AllTimepoints"}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("before it starts"));
    assert!(serde_json::from_str::<ExportConfig>(r#"{"window":{"from":9,"till":0}}"#).is_err());

    let window: TimeWindow = serde_json::from_str(r#"{"from":1,"till":5}"#).unwrap();
    assert_eq!(window, TimeWindow::new(1, 5).unwrap());
}
