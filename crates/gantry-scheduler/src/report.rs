//! Result aggregation.

use gantry_core::job::{JobResult, PipelineResult, PipelineStatus};
use std::collections::BTreeMap;

/// Reduce per-job outcomes into a single pipeline status.
///
/// Success iff every job exited 0. The per-job detail is preserved
/// untouched for downstream reporting; only the aggregate is derived.
pub fn aggregate(results: BTreeMap<String, JobResult>) -> PipelineResult {
    let status = if !results.is_empty() && results.values().all(|r| r.exit_code == Some(0)) {
        PipelineStatus::Success
    } else {
        PipelineStatus::Failure
    };

    PipelineResult { status, results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::job::JobStatus;

    fn result(name: &str, status: JobStatus, exit_code: Option<i32>) -> (String, JobResult) {
        (
            name.to_string(),
            JobResult {
                job_name: name.to_string(),
                status,
                exit_code,
                duration_ms: 10,
                log: vec![],
            },
        )
    }

    #[test]
    fn test_all_zero_exit_codes_succeed() {
        let results: BTreeMap<_, _> = [
            result("check", JobStatus::Success, Some(0)),
            result("fmt", JobStatus::Success, Some(0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(aggregate(results).status, PipelineStatus::Success);
    }

    #[test]
    fn test_single_failure_fails_pipeline() {
        let results: BTreeMap<_, _> = [
            result("check", JobStatus::Success, Some(0)),
            result("fmt", JobStatus::Failure, Some(1)),
            result("clippy", JobStatus::Success, Some(0)),
            result("test", JobStatus::Success, Some(0)),
        ]
        .into_iter()
        .collect();

        let aggregated = aggregate(results);
        assert_eq!(aggregated.status, PipelineStatus::Failure);
        // Every individual result is still present with its exit code.
        assert_eq!(aggregated.results.len(), 4);
        assert_eq!(aggregated.results["fmt"].exit_code, Some(1));
        assert_eq!(aggregated.results["check"].exit_code, Some(0));
    }

    #[test]
    fn test_timeout_is_a_failure() {
        let results: BTreeMap<_, _> = [result("test", JobStatus::Timeout, None)]
            .into_iter()
            .collect();

        let aggregated = aggregate(results);
        assert_eq!(aggregated.status, PipelineStatus::Failure);
        assert_eq!(aggregated.results["test"].status, JobStatus::Timeout);
    }

    #[test]
    fn test_empty_result_set_is_failure() {
        assert_eq!(aggregate(BTreeMap::new()).status, PipelineStatus::Failure);
    }
}
