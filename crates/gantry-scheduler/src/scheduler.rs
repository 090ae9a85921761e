//! Concurrent fan-out of independent jobs.
//!
//! All jobs launch together with no ordering constraint between them; a
//! failing job never cancels its siblings. The only shared resource is
//! the cache store, which serializes writes per key on its own.

use crate::report::aggregate;
use crate::triggers::{PathFilter, should_run};
use gantry_cache::{CacheKey, CacheStore, archiver};
use gantry_core::Result;
use gantry_core::event::Event;
use gantry_core::ids::{PipelineId, RunId};
use gantry_core::job::{JobResult, JobStatus, LogLine, RunOutcome, RunReport};
use gantry_core::pipeline::{JobDefinition, PipelineDefinition};
use gantry_runner::{EnvironmentFactory, RunnerConfig, TaskContext, TaskRunner};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

/// Cancels a run in flight. Already-saved cache entries stay intact.
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-task view of a [`CancellationSource`].
#[derive(Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Resolves when the run is cancelled; pends forever if the source
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|c| *c).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// A token that can never fire, for uncancellable runs.
    pub fn never() -> Self {
        let source = CancellationSource::new();
        source.token()
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Source checkout the jobs run against.
    pub workspace: PathBuf,
    pub runner: RunnerConfig,
}

impl SchedulerConfig {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            runner: RunnerConfig::default(),
        }
    }
}

/// Shared cache inputs for one run, computed once from the pipeline
/// definition so per-job key construction stays a pure function.
#[derive(Clone)]
struct CacheContext {
    store: Arc<dyn CacheStore>,
    namespace: String,
    os: String,
    lock_contents: Vec<u8>,
    version_tag: String,
}

impl CacheContext {
    fn key_for(&self, job_name: &str) -> CacheKey {
        CacheKey::new(
            &self.namespace,
            &self.os,
            job_name,
            &self.lock_contents,
            &self.version_tag,
        )
    }
}

/// Orchestrates one pipeline run: trigger gate, job fan-out, aggregation.
pub struct JobScheduler {
    runner: Arc<dyn TaskRunner>,
    environments: Arc<dyn EnvironmentFactory>,
    cache: Option<Arc<dyn CacheStore>>,
    config: SchedulerConfig,
}

impl JobScheduler {
    pub fn new(
        runner: Arc<dyn TaskRunner>,
        environments: Arc<dyn EnvironmentFactory>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            runner,
            environments,
            cache: None,
            config,
        }
    }

    /// Attach a cache store. Without one every run is cold.
    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Handle an event end to end and produce the run report.
    pub async fn run_pipeline(
        &self,
        definition: &PipelineDefinition,
        event: &Event,
    ) -> Result<RunReport> {
        self.run_pipeline_with_cancel(definition, event, CancellationToken::never())
            .await
    }

    /// As [`run_pipeline`](Self::run_pipeline), with external cancellation.
    pub async fn run_pipeline_with_cancel(
        &self,
        definition: &PipelineDefinition,
        event: &Event,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        definition.validate()?;

        let run_id = RunId::new();
        let pipeline_id = PipelineId::new();
        let started_at = chrono::Utc::now();
        let start = std::time::Instant::now();

        let filter = PathFilter::from_config(&definition.filter);
        let outcome = if !should_run(event, &filter) {
            // Short-circuit: no jobs run, no cache operations occur.
            info!(pipeline = %definition.name, "Run skipped: only excluded paths changed");
            RunOutcome::Skipped
        } else {
            let cache_ctx = self.cache_context(definition).await;
            let results = self.run_jobs(definition, cache_ctx, cancel).await;
            RunOutcome::Completed(aggregate(results))
        };

        Ok(RunReport {
            run_id,
            pipeline_id,
            pipeline_name: definition.name.clone(),
            outcome,
            started_at,
            completed_at: chrono::Utc::now(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn cache_context(&self, definition: &PipelineDefinition) -> Option<CacheContext> {
        let store = self.cache.as_ref()?;
        let config = definition.cache.as_ref()?;

        let lock_path = if config.lockfile.is_absolute() {
            config.lockfile.clone()
        } else {
            self.config.workspace.join(&config.lockfile)
        };

        match tokio::fs::read(&lock_path).await {
            Ok(lock_contents) => Some(CacheContext {
                store: Arc::clone(store),
                namespace: definition.name.clone(),
                os: config.os_tag().to_string(),
                lock_contents,
                version_tag: config.version_tag.clone(),
            }),
            Err(e) => {
                warn!(lockfile = %lock_path.display(), error = %e, "Lockfile unreadable, running without cache");
                None
            }
        }
    }

    /// Fan the job set out concurrently and join on all of them.
    async fn run_jobs(
        &self,
        definition: &PipelineDefinition,
        cache: Option<CacheContext>,
        cancel: CancellationToken,
    ) -> BTreeMap<String, JobResult> {
        let mut join_set = JoinSet::new();
        let mut task_names: HashMap<tokio::task::Id, String> = HashMap::new();

        for job in &definition.jobs {
            let mut variables = definition.variables.clone();
            variables.extend(job.variables.clone());

            let job = job.clone();
            let job_name = job.name.clone();
            let runner = Arc::clone(&self.runner);
            let environments = Arc::clone(&self.environments);
            let cache = cache.clone();
            let default_timeout = self.config.runner.default_timeout_seconds;
            let cancel = cancel.clone();

            let handle = join_set.spawn(execute_job(
                job,
                variables,
                runner,
                environments,
                cache,
                default_timeout,
                cancel,
            ));
            task_names.insert(handle.id(), job_name);
        }

        // Join barrier across exactly the job count. A panicked task still
        // accounts for its job: every job name appears in the result map.
        let mut results = BTreeMap::new();
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, result)) => {
                    results.insert(result.job_name.clone(), result);
                }
                Err(e) => {
                    let job_name = task_names.get(&e.id()).cloned().unwrap_or_default();
                    warn!(job = %job_name, error = %e, "Job task panicked");
                    results.insert(
                        job_name.clone(),
                        JobResult {
                            job_name,
                            status: JobStatus::Failure,
                            exit_code: None,
                            duration_ms: 0,
                            log: Vec::new(),
                        },
                    );
                }
            }
        }
        results
    }
}

/// Execute one job: acquire environment, restore cache, run the command,
/// save cache, tear down. The environment teardown runs on every exit
/// path, including timeout and cancellation.
async fn execute_job(
    job: JobDefinition,
    variables: HashMap<String, String>,
    runner: Arc<dyn TaskRunner>,
    environments: Arc<dyn EnvironmentFactory>,
    cache: Option<CacheContext>,
    default_timeout_seconds: u64,
    mut cancel: CancellationToken,
) -> JobResult {
    let start = std::time::Instant::now();

    let env = environments.create(&job.name);
    if let Err(e) = env.prepare().await {
        warn!(job = %job.name, error = %e, "Environment acquisition failed");
        if let Err(e) = env.cleanup().await {
            warn!(job = %job.name, error = %e, "Environment cleanup failed");
        }
        return JobResult {
            job_name: job.name,
            status: JobStatus::EnvironmentFailed,
            exit_code: None,
            duration_ms: start.elapsed().as_millis() as u64,
            log: Vec::new(),
        };
    }
    let workdir = env.working_dir().to_path_buf();

    let core = tokio::select! {
        outcome = run_job_core(&job, variables, runner, &cache, &workdir, default_timeout_seconds) => Some(outcome),
        _ = cancel.cancelled() => {
            info!(job = %job.name, "Job cancelled");
            None
        }
    };

    if let Err(e) = env.cleanup().await {
        warn!(job = %job.name, error = %e, "Environment cleanup failed");
    }

    match core {
        Some((status, exit_code, log)) => JobResult {
            job_name: job.name,
            status,
            exit_code,
            duration_ms: start.elapsed().as_millis() as u64,
            log,
        },
        None => JobResult {
            job_name: job.name,
            status: JobStatus::Cancelled,
            exit_code: None,
            duration_ms: start.elapsed().as_millis() as u64,
            log: Vec::new(),
        },
    }
}

async fn run_job_core(
    job: &JobDefinition,
    variables: HashMap<String, String>,
    runner: Arc<dyn TaskRunner>,
    cache: &Option<CacheContext>,
    workdir: &Path,
    default_timeout_seconds: u64,
) -> (JobStatus, Option<i32>, Vec<LogLine>) {
    if let Some(cache) = cache {
        restore_cache(cache, job, workdir).await;
    }

    let (tx, mut rx) = mpsc::channel::<LogLine>(256);
    let collector = tokio::spawn(async move {
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    });

    let ctx = TaskContext {
        job_name: job.name.clone(),
        command: job.run.clone(),
        workspace: workdir.to_path_buf(),
        variables,
    };

    let timeout_seconds = if job.timeout_minutes > 0 {
        job.timeout_minutes as u64 * 60
    } else {
        default_timeout_seconds
    };

    let outcome = timeout(
        Duration::from_secs(timeout_seconds),
        runner.execute(&ctx, tx),
    )
    .await;

    let log = collector.await.unwrap_or_default();

    let (status, exit_code) = match outcome {
        Ok(Ok(task)) => {
            let status = if task.success {
                JobStatus::Success
            } else {
                JobStatus::Failure
            };
            (status, Some(task.exit_code))
        }
        Ok(Err(e)) => {
            warn!(job = %job.name, error = %e, "Task runner error");
            (JobStatus::Failure, None)
        }
        Err(_) => {
            warn!(job = %job.name, timeout_seconds, "Job timed out");
            (JobStatus::Timeout, None)
        }
    };

    // Save updated cache contents once the command actually ran. Errors
    // degrade to a warning; a cache outage never fails the job.
    if let Some(cache) = cache
        && exit_code.is_some()
    {
        save_cache(cache, job, workdir).await;
    }

    (status, exit_code, log)
}

async fn restore_cache(cache: &CacheContext, job: &JobDefinition, workdir: &Path) {
    if job.cache_paths.is_empty() {
        return;
    }
    let key = cache.key_for(&job.name);

    match cache.store.restore(&key).await {
        Ok(Some(entry)) => {
            let dest = workdir.to_path_buf();
            let unpack =
                tokio::task::spawn_blocking(move || archiver::extract_archive(entry.blob.as_slice(), &dest))
                    .await;
            match unpack {
                Ok(Ok(())) => info!(job = %job.name, key = %key, "Cache restored"),
                Ok(Err(e)) => warn!(job = %job.name, error = %e, "Cache entry unusable, running cold"),
                Err(e) => warn!(job = %job.name, error = %e, "Cache unpack task failed"),
            }
        }
        Ok(None) => debug!(job = %job.name, key = %key, "Cache miss"),
        Err(e) => warn!(job = %job.name, error = %e, "Cache unavailable, running cold"),
    }
}

async fn save_cache(cache: &CacheContext, job: &JobDefinition, workdir: &Path) {
    if job.cache_paths.is_empty() {
        return;
    }
    let key = cache.key_for(&job.name);

    let paths = job.cache_paths.clone();
    let base = workdir.to_path_buf();
    let packed = tokio::task::spawn_blocking(move || {
        let mut blob = Vec::new();
        archiver::create_archive(&mut blob, &paths, &base)?;
        Ok::<_, gantry_core::Error>(blob)
    })
    .await;

    let blob = match packed {
        Ok(Ok(blob)) => blob,
        Ok(Err(e)) => {
            warn!(job = %job.name, error = %e, "Failed to pack cache paths");
            return;
        }
        Err(e) => {
            warn!(job = %job.name, error = %e, "Cache pack task failed");
            return;
        }
    };

    match cache.store.save(&key, &job.cache_paths, &blob).await {
        Ok(()) => info!(job = %job.name, key = %key, size_bytes = blob.len(), "Cache saved"),
        Err(e) => warn!(job = %job.name, error = %e, "Cache save failed, continuing"),
    }
}
