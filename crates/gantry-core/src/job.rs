//! Job and pipeline result types.

use crate::ids::{PipelineId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal status of a single job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failure,
    Timeout,
    Cancelled,
    /// The job's execution environment could not be acquired. Fatal to
    /// this job only; sibling jobs proceed.
    EnvironmentFailed,
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success)
    }
}

/// A single captured output line from a job's command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: LogStream,
    pub line_number: u32,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Outcome of one job execution. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_name: String,
    pub status: JobStatus,
    /// Exit code of the external command, when one was observed. Absent
    /// for timeouts, cancellations, and environment failures.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub log: Vec<LogLine>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Aggregate status of a completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    Failure,
}

/// Reduced outcome of all jobs in a run. Success iff every job exited 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    /// Per-job detail, preserved for downstream reporting. Keyed by job
    /// name; ordered for stable output.
    pub results: BTreeMap<String, JobResult>,
}

/// Outcome of submitting an event to the orchestrator.
///
/// A skipped run is distinguishable from both success and failure: the
/// trigger gate short-circuited before any job or cache operation ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Skipped,
    Completed(PipelineResult),
}

impl RunOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Skipped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunOutcome::Completed(PipelineResult {
                status: PipelineStatus::Failure,
                ..
            })
        )
    }
}

/// Machine-readable report for one run, suitable for display and for
/// branch-protection-style gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub pipeline_id: PipelineId,
    pub pipeline_name: String,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_is_not_failure() {
        let outcome = RunOutcome::Skipped;
        assert!(outcome.is_skipped());
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::EnvironmentFailed).unwrap();
        assert_eq!(json, "\"environment_failed\"");
    }
}
