// Tests for report generation functionality

use warcgraph_core::report::{
    ReportFormat, generate_json_report, generate_report, generate_text_report, save_report,
};
use warcgraph_core::{CounterSnapshot, JobKind, JobSummary, OutputFormat};
use tempfile::TempDir;

fn summary() -> JobSummary {
    JobSummary {
        run_id: "7f3c1e2a-0000-4000-8000-000000000001".to_string(),
        kind: JobKind::Edges,
        inputs: vec!["/data/clue".to_string()],
        output: "/tmp/edges".to_string(),
        format: OutputFormat::Tsv,
        shards: 4,
        retries: 1,
        rows: 120,
        counters: CounterSnapshot {
            pages: 10,
            links: 120,
            bad_source_url: 0,
            bad_dest_url: 3,
            payload_parse_error: 1,
        },
        started_at: "2024-01-01T00:00:00+00:00".to_string(),
        finished_at: "2024-01-01T00:01:00+00:00".to_string(),
    }
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("html"), None);
}

// ============================================================================
// Text Report Tests
// ============================================================================

#[test]
fn test_text_report_contains_counters() {
    colored::control::set_override(false);
    let report = generate_text_report(&summary());

    assert!(report.contains("EDGES JOB SUMMARY"));
    assert!(report.contains("Run ID:       7f3c1e2a-0000-4000-8000-000000000001"));
    assert!(report.contains("Inputs:       /data/clue"));
    assert!(report.contains("Retries:      1"));
    assert!(report.contains("Rows:         120"));
    for name in [
        "PAGES",
        "LINKS",
        "BAD_SOURCE_URL",
        "BAD_DEST_URL",
        "PAYLOAD_PARSE_ERROR",
    ] {
        assert!(report.contains(name), "missing counter {}", name);
    }
}

#[test]
fn test_text_report_hides_zero_retries() {
    colored::control::set_override(false);
    let mut data = summary();
    data.retries = 0;
    data.inputs = vec!["a.warc".to_string(), "b.warc".to_string()];

    let report = generate_text_report(&data);
    assert!(!report.contains("Retries:"));
    assert!(report.contains("Inputs:       2 paths"));
}

// ============================================================================
// JSON Report Tests
// ============================================================================

#[test]
fn test_json_report_structure() {
    let json = generate_json_report(&summary()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let report = &value["report"];
    assert_eq!(report["metadata"]["generator"], "warcgraph");
    assert!(report["metadata"]["generated_at"].is_string());
    assert_eq!(report["run"]["kind"], "edges");
    assert_eq!(report["run"]["output_format"], "tsv");
    assert_eq!(report["run"]["rows"], 120);
    assert_eq!(report["counters"]["LINKS"], 120);
    assert_eq!(report["counters"]["BAD_DEST_URL"], 3);
    assert_eq!(report["counters"]["PAYLOAD_PARSE_ERROR"], 1);
}

#[test]
fn test_generate_report_dispatches_on_format() {
    let json = generate_report(&summary(), ReportFormat::Json).unwrap();
    assert!(json.trim_start().starts_with('{'));

    colored::control::set_override(false);
    let text = generate_report(&summary(), ReportFormat::Text).unwrap();
    assert!(text.contains("COUNTERS"));
}

#[test]
fn test_save_report() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.json");

    save_report("{}", &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}
