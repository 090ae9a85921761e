//! Core runner trait and types.

use async_trait::async_trait;
use gantry_core::Result;
use gantry_core::job::LogLine;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Outcome of one external command invocation.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub exit_code: i32,
    pub success: bool,
    pub duration_ms: u64,
}

/// Context for a task invocation.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub job_name: String,
    pub command: String,
    pub workspace: PathBuf,
    pub variables: HashMap<String, String>,
}

/// The external Task Runner collaborator.
///
/// Given a command and a working directory, execute it, stream output
/// lines to the provided channel, and report the exit code. The
/// orchestrator imposes no further contract.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn execute(&self, ctx: &TaskContext, output_tx: mpsc::Sender<LogLine>)
    -> Result<TaskOutcome>;
}

/// Configuration for task execution.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Per-job wall-clock bound. The scheduler applies the job's own
    /// timeout when set; this is the hosting default.
    pub default_timeout_seconds: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 3600,
        }
    }
}
