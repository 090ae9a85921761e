//! Execution environment management.
//!
//! Each job execution acquires a fresh environment and tears it down
//! unconditionally on every exit path, success or failure.

use gantry_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// An isolated execution context for one job.
#[async_trait::async_trait]
pub trait Environment: Send + Sync {
    /// Prepare the execution environment.
    async fn prepare(&self) -> Result<()>;

    /// Get the working directory.
    fn working_dir(&self) -> &Path;

    /// Tear down the execution environment.
    async fn cleanup(&self) -> Result<()>;
}

/// Host environment: a per-job working directory on the local machine.
pub struct HostEnvironment {
    workspace: PathBuf,
    remove_on_cleanup: bool,
}

impl HostEnvironment {
    /// Use an existing directory as the workspace; left in place on
    /// cleanup.
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            remove_on_cleanup: false,
        }
    }

    /// A scratch workspace under `root` that is removed on cleanup.
    pub fn scratch(root: &Path, job_name: &str) -> Self {
        Self {
            workspace: root.join(format!("gantry-{}-{}", job_name, std::process::id())),
            remove_on_cleanup: true,
        }
    }
}

#[async_trait::async_trait]
impl Environment for HostEnvironment {
    async fn prepare(&self) -> Result<()> {
        info!(workspace = %self.workspace.display(), "Preparing host environment");
        tokio::fs::create_dir_all(&self.workspace)
            .await
            .map_err(|e| {
                Error::EnvironmentAcquisitionFailed(format!(
                    "failed to create workspace {}: {}",
                    self.workspace.display(),
                    e
                ))
            })?;
        Ok(())
    }

    fn working_dir(&self) -> &Path {
        &self.workspace
    }

    async fn cleanup(&self) -> Result<()> {
        info!(workspace = %self.workspace.display(), "Cleaning up host environment");
        if self.remove_on_cleanup && self.workspace.exists() {
            tokio::fs::remove_dir_all(&self.workspace)
                .await
                .map_err(|e| Error::Internal(format!("failed to remove workspace: {}", e)))?;
        }
        Ok(())
    }
}

/// Creates one environment per job execution.
pub trait EnvironmentFactory: Send + Sync {
    fn create(&self, job_name: &str) -> Box<dyn Environment>;
}

/// Factory handing every job the same host workspace.
pub struct HostEnvironmentFactory {
    workspace: PathBuf,
}

impl HostEnvironmentFactory {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

impl EnvironmentFactory for HostEnvironmentFactory {
    fn create(&self, _job_name: &str) -> Box<dyn Environment> {
        Box::new(HostEnvironment::new(self.workspace.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scratch_environment_lifecycle() {
        let root = tempfile::tempdir().unwrap();
        let env = HostEnvironment::scratch(root.path(), "check");

        env.prepare().await.unwrap();
        assert!(env.working_dir().exists());

        env.cleanup().await.unwrap();
        assert!(!env.working_dir().exists());
    }

    #[tokio::test]
    async fn test_existing_workspace_survives_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let env = HostEnvironment::new(dir.path().to_path_buf());

        env.prepare().await.unwrap();
        env.cleanup().await.unwrap();
        assert!(dir.path().exists());
    }
}
