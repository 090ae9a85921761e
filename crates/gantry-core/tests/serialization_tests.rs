//! Serialization roundtrip tests for gantry-core types.

use chrono::Utc;
use gantry_core::event::{Event, EventKind};
use gantry_core::ids::*;
use gantry_core::job::*;
use gantry_core::pipeline::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

#[test]
fn test_event_roundtrip() {
    let event = Event::push(vec!["src/lib.rs".to_string(), "README.md".to_string()]);

    let json = serde_json::to_string(&event).expect("serialize");
    let parsed: Event = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(parsed.kind, EventKind::Push);
    assert_eq!(parsed.changed_paths, event.changed_paths);
}

#[test]
fn test_job_result_roundtrip() {
    let result = JobResult {
        job_name: "clippy".to_string(),
        status: JobStatus::Failure,
        exit_code: Some(101),
        duration_ms: 4321,
        log: vec![LogLine {
            stream: LogStream::Stderr,
            line_number: 1,
            content: "error: unused variable".to_string(),
            timestamp: Utc::now(),
        }],
    };

    let json = serde_json::to_string(&result).expect("serialize");
    let parsed: JobResult = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(parsed.job_name, "clippy");
    assert_eq!(parsed.status, JobStatus::Failure);
    assert_eq!(parsed.exit_code, Some(101));
    assert_eq!(parsed.log.len(), 1);
}

#[test]
fn test_run_report_tags_skipped_outcome() {
    let report = RunReport {
        run_id: RunId::new(),
        pipeline_id: PipelineId::new(),
        pipeline_name: "ci".to_string(),
        outcome: RunOutcome::Skipped,
        started_at: Utc::now(),
        completed_at: Utc::now(),
        duration_ms: 0,
    };

    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["outcome"], "skipped");
}

#[test]
fn test_run_report_completed_roundtrip() {
    let mut results = BTreeMap::new();
    results.insert(
        "test".to_string(),
        JobResult {
            job_name: "test".to_string(),
            status: JobStatus::Success,
            exit_code: Some(0),
            duration_ms: 900,
            log: vec![],
        },
    );

    let report = RunReport {
        run_id: RunId::new(),
        pipeline_id: PipelineId::new(),
        pipeline_name: "ci".to_string(),
        outcome: RunOutcome::Completed(PipelineResult {
            status: PipelineStatus::Success,
            results,
        }),
        started_at: Utc::now(),
        completed_at: Utc::now(),
        duration_ms: 900,
    };

    let json = serde_json::to_string(&report).expect("serialize");
    let parsed: RunReport = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(parsed.pipeline_name, "ci");
    assert!(!parsed.outcome.is_skipped());
}

#[test]
fn test_pipeline_definition_from_yaml() {
    let yaml = r#"
name: ci
filter:
  paths_ignore:
    - "README.md"
    - "docs/**"
cache:
  lockfile: Cargo.lock
  version_tag: v2
jobs:
  - name: check
    run: cargo check --all-targets
    cache_paths: ["target", "~/.cargo/registry"]
  - name: fmt
    run: cargo fmt --check
"#;

    let def: PipelineDefinition = serde_yaml::from_str(yaml).expect("parse");
    def.validate().expect("valid");

    assert_eq!(def.name, "ci");
    assert_eq!(def.filter.paths_ignore.len(), 2);
    assert_eq!(def.jobs.len(), 2);
    assert_eq!(def.jobs[0].timeout_minutes, 30);
    assert_eq!(def.cache.as_ref().unwrap().version_tag, "v2");
}
