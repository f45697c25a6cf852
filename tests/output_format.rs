//! End-to-end output behavior: CSV schema, JSON export, enable/disable
//! gating and timing tolerance.

use std::time::Duration;

use phyloperf::{Config, MilestoneKind, OutputFormat, PerfContext, CSV_HEADER};

#[test]
fn flushed_csv_matches_the_documented_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("perf.csv");
    let config = Config::builder()
        .output_format(OutputFormat::Csv)
        .output_file(&path)
        .build()
        .unwrap();
    let ctx = PerfContext::with_config(config).unwrap();

    ctx.start_milestone_labeled(MilestoneKind::ClusteringStart, "k-means");
    ctx.end_milestone_labeled(MilestoneKind::ClusteringStart, "k-means");
    ctx.log_iteration(1, 0.85);
    ctx.log_event_with_context("sequence_count", 120.0, "cluster_3");
    ctx.flush().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), CSV_HEADER);

    let data_rows: Vec<&str> = lines.collect();
    assert_eq!(data_rows.len(), 3);
    for row in data_rows {
        assert!(row.matches(',').count() >= 10, "short row: {}", row);
    }
    assert!(text.contains("CLUSTERING_START"));
    assert!(text.contains("iteration_1"));
    assert!(text.contains("convergence=0.850000"));
}

#[test]
fn flush_rewrites_rather_than_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("perf.csv");
    let config = Config::builder()
        .output_format(OutputFormat::Csv)
        .output_file(&path)
        .build()
        .unwrap();
    let ctx = PerfContext::with_config(config).unwrap();

    ctx.log_event("a", 1.0);
    ctx.flush().unwrap();
    ctx.log_event("b", 2.0);
    ctx.flush().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    // Header plus one row per record, not per flush.
    assert_eq!(text.lines().count(), 3);
    // Flushing does not clear the buffer.
    assert_eq!(ctx.log_count(), 2);
}

#[test]
fn json_export_parses_and_mirrors_the_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("perf.json");
    let ctx = PerfContext::with_config(quiet_config(&dir)).unwrap();

    ctx.log_iteration(7, 0.5);
    ctx.export_json(&path).unwrap();

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["milestone"], "CLUSTERING_ITERATION");
    assert_eq!(record["iteration"], 7);
    assert_eq!(record["convergence_metric"], 0.5);
    assert!(record["memory"].is_object());
    assert!(record["cpu"].is_object());
}

#[test]
fn csv_export_ignores_the_configured_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    let ctx = PerfContext::with_config(quiet_config(&dir)).unwrap();

    ctx.log_event("score", 10.0);
    ctx.export_csv(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(CSV_HEADER));
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn disabling_gates_recording_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = PerfContext::with_config(quiet_config(&dir)).unwrap();

    ctx.set_enabled(false);
    ctx.start_milestone(MilestoneKind::AlignmentStart);
    ctx.end_milestone(MilestoneKind::AlignmentStart);
    assert_eq!(ctx.log_count(), 0);

    ctx.set_enabled(true);
    ctx.start_milestone(MilestoneKind::AlignmentStart);
    ctx.end_milestone(MilestoneKind::AlignmentStart);
    assert_eq!(ctx.log_count(), 1);
}

#[test]
fn milestone_duration_tracks_wall_time() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = PerfContext::with_config(quiet_config(&dir)).unwrap();

    ctx.start_milestone(MilestoneKind::KalignExecution);
    std::thread::sleep(Duration::from_millis(5));
    ctx.end_milestone(MilestoneKind::KalignExecution);

    let stats = ctx
        .milestone_statistics(MilestoneKind::KalignExecution)
        .unwrap();
    assert!(
        stats.min >= 4.0 && stats.min < 500.0,
        "duration out of tolerance: {} ms",
        stats.min
    );
}

#[test]
fn detailed_report_includes_the_statistics_table() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = PerfContext::with_config(quiet_config(&dir)).unwrap();

    for _ in 0..4 {
        ctx.start_milestone(MilestoneKind::TreeBranchLengthCalc);
        ctx.end_milestone(MilestoneKind::TreeBranchLengthCalc);
    }

    let report = ctx.detailed_report();
    assert!(report.contains("=== Performance Summary ==="));
    assert!(report.contains("Total Log Entries: 4"));
    assert!(report.contains("TREE_BRANCH_LENGTH_CALC"));
    assert!(report.contains("samples"));
}

#[test]
fn tracking_toggles_zero_the_gated_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("perf.csv");
    let config = Config::builder()
        .output_format(OutputFormat::Csv)
        .output_file(&path)
        .track_memory(false)
        .track_cpu(false)
        .build()
        .unwrap();
    let ctx = PerfContext::with_config(config).unwrap();

    ctx.start_milestone(MilestoneKind::OutputWrite);
    ctx.end_milestone(MilestoneKind::OutputWrite);
    ctx.flush().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let row = text.lines().nth(1).unwrap();
    let fields: Vec<&str> = row.split(',').collect();
    assert_eq!(fields[3], "0"); // memory_rss_kb
    assert_eq!(fields[8], "0.00"); // cpu_percent
}

fn quiet_config(dir: &tempfile::TempDir) -> Config {
    Config::builder()
        .output_file(dir.path().join("drop_flush.log"))
        .build()
        .unwrap()
}
