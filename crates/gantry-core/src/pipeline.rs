//! Pipeline definition types.
//!
//! These types represent the user-authored pipeline YAML configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filter: PathFilterConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    pub jobs: Vec<JobDefinition>,
    #[serde(default = "default_timeout")]
    pub timeout_minutes: u32,
}

fn default_timeout() -> u32 {
    60
}

/// Path-based trigger filtering. Exclusion only: a run is skipped when
/// every changed path matches an exclude pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathFilterConfig {
    #[serde(default)]
    pub paths_ignore: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Dependency-lock file whose contents fingerprint the cache key.
    pub lockfile: PathBuf,
    /// Manual cache-format epoch, bumped to force invalidation.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,
    /// Operating-system tag for the key. Defaults to the host OS at load
    /// time so key construction itself stays a pure function.
    #[serde(default)]
    pub os: Option<String>,
}

fn default_version_tag() -> String {
    "v1".to_string()
}

impl CacheConfig {
    pub fn os_tag(&self) -> &str {
        self.os.as_deref().unwrap_or(std::env::consts::OS)
    }
}

/// An independently schedulable unit of verification work.
///
/// Jobs carry no dependency edges; any ordering observed between them is
/// incidental to concurrency, not a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub run: String,
    #[serde(default)]
    pub cache_paths: Vec<PathBuf>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default = "default_job_timeout")]
    pub timeout_minutes: u32,
}

fn default_job_timeout() -> u32 {
    30
}

impl PipelineDefinition {
    /// Validate structural invariants of the definition.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty() {
            return Err(crate::Error::InvalidPipeline(
                "pipeline name must not be empty".to_string(),
            ));
        }
        if self.jobs.is_empty() {
            return Err(crate::Error::InvalidPipeline(
                "pipeline must define at least one job".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for job in &self.jobs {
            if job.name.is_empty() {
                return Err(crate::Error::InvalidPipeline(
                    "job name must not be empty".to_string(),
                ));
            }
            if !seen.insert(job.name.as_str()) {
                return Err(crate::Error::InvalidPipeline(format!(
                    "duplicate job name: {}",
                    job.name
                )));
            }
            if job.run.trim().is_empty() {
                return Err(crate::Error::InvalidPipeline(format!(
                    "job '{}' has an empty command",
                    job.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_job(name: &str) -> JobDefinition {
        JobDefinition {
            name: name.to_string(),
            run: "true".to_string(),
            cache_paths: vec![],
            variables: HashMap::new(),
            timeout_minutes: 30,
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_jobs() {
        let def = PipelineDefinition {
            name: "ci".to_string(),
            description: None,
            filter: PathFilterConfig::default(),
            cache: None,
            variables: HashMap::new(),
            jobs: vec![minimal_job("check"), minimal_job("check")],
            timeout_minutes: 60,
        };
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_jobs() {
        let def = PipelineDefinition {
            name: "ci".to_string(),
            description: None,
            filter: PathFilterConfig::default(),
            cache: None,
            variables: HashMap::new(),
            jobs: vec![],
            timeout_minutes: 60,
        };
        assert!(def.validate().is_err());
    }
}
