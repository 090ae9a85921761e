//! Shell-based task execution on the host.

use crate::runner::{TaskContext, TaskOutcome, TaskRunner};
use async_trait::async_trait;
use gantry_core::Result;
use gantry_core::job::{LogLine, LogStream};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Task runner that executes commands with `sh -c` on the host.
#[derive(Debug, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskRunner for ShellRunner {
    async fn execute(
        &self,
        ctx: &TaskContext,
        output_tx: mpsc::Sender<LogLine>,
    ) -> Result<TaskOutcome> {
        let start = std::time::Instant::now();

        info!(job = %ctx.job_name, command = %ctx.command, workspace = %ctx.workspace.display(), "Executing command");

        let mut env_vars: HashMap<String, String> = std::env::vars().collect();
        env_vars.extend(ctx.variables.clone());

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&ctx.command)
            .current_dir(&ctx.workspace)
            .envs(&env_vars)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The scheduler enforces timeouts and cancellation by dropping
            // this future; the child must not outlive it.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| gantry_core::Error::Internal(format!("Failed to spawn process: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| gantry_core::Error::Internal("missing stdout pipe".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| gantry_core::Error::Internal("missing stderr pipe".to_string()))?;

        let stdout_tx = output_tx.clone();
        let stdout_handle = tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            let mut line_num = 0u32;

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                let output = LogLine {
                    stream: LogStream::Stdout,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                if stdout_tx.send(output).await.is_err() {
                    break;
                }
            }
        });

        let stderr_tx = output_tx;
        let stderr_handle = tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            let mut line_num = 0u32;

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                let output = LogLine {
                    stream: LogStream::Stderr,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                if stderr_tx.send(output).await.is_err() {
                    break;
                }
            }
        });

        let status = child.wait().await.map_err(|e| {
            gantry_core::Error::Internal(format!("Failed to wait for process: {}", e))
        })?;

        let _ = stdout_handle.await;
        let _ = stderr_handle.await;

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(job = %ctx.job_name, exit_code, duration_ms, "Command completed");

        Ok(TaskOutcome {
            exit_code,
            success: exit_code == 0,
            duration_ms,
        })
    }
}
