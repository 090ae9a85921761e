//! CLI command handlers.

use crate::commands::{EventArg, RunArgs};
use console::style;
use gantry_cache::FilesystemStore;
use gantry_core::event::Event;
use gantry_core::job::{JobStatus, PipelineStatus, RunOutcome, RunReport};
use gantry_core::pipeline::PipelineDefinition;
use gantry_runner::{HostEnvironmentFactory, ShellRunner};
use gantry_scheduler::{JobScheduler, SchedulerConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Find the pipeline file in standard locations.
fn find_pipeline_file(path: Option<&str>) -> Option<PathBuf> {
    if let Some(p) = path {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
        return None;
    }

    let candidates = [
        ".gantry/pipeline.yaml",
        ".gantry/pipeline.yml",
        "gantry.yaml",
        "gantry.yml",
    ];

    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

fn load_pipeline(path: &Path) -> CliResult<PipelineDefinition> {
    let content = std::fs::read_to_string(path)?;
    let definition: PipelineDefinition = serde_yaml::from_str(&content)?;
    definition.validate()?;
    Ok(definition)
}

pub fn validate(path: Option<&str>) -> CliResult<ExitCode> {
    let Some(file) = find_pipeline_file(path) else {
        eprintln!("{} No pipeline file found", style("✗").red());
        return Ok(ExitCode::from(2));
    };

    match load_pipeline(&file) {
        Ok(definition) => {
            println!(
                "{} {} is valid ({} jobs)",
                style("✓").green(),
                file.display(),
                definition.jobs.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} {}: {}", style("✗").red(), file.display(), e);
            Ok(ExitCode::from(2))
        }
    }
}

pub async fn run(args: RunArgs) -> CliResult<ExitCode> {
    let Some(file) = find_pipeline_file(args.pipeline.as_deref()) else {
        eprintln!("{} No pipeline file found", style("✗").red());
        return Ok(ExitCode::from(2));
    };
    let definition = load_pipeline(&file)?;

    let workspace = match args.workspace {
        Some(ws) => ws,
        None => std::env::current_dir()?,
    };

    let event = match args.event {
        EventArg::Push => Event::push(args.changed_paths),
        EventArg::PullRequest => Event::pull_request(args.changed_paths),
        EventArg::Manual => Event::manual(),
    };

    let mut scheduler = JobScheduler::new(
        Arc::new(ShellRunner::new()),
        Arc::new(HostEnvironmentFactory::new(workspace.clone())),
        SchedulerConfig::new(workspace),
    );
    if !args.no_cache {
        let cache_root = args.cache_dir.unwrap_or_else(FilesystemStore::default_root);
        scheduler = scheduler.with_cache(Arc::new(FilesystemStore::new(cache_root)));
    }

    println!(
        "\n{} Running pipeline: {} ({} jobs)\n",
        style("▶").cyan().bold(),
        style(&definition.name).bold(),
        definition.jobs.len()
    );

    let report = scheduler.run_pipeline(&definition, &event).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(exit_code_for(&report))
}

fn print_summary(report: &RunReport) {
    match &report.outcome {
        RunOutcome::Skipped => {
            println!(
                "{} Pipeline {} skipped: only excluded paths changed",
                style("⏭").dim(),
                style(&report.pipeline_name).bold()
            );
        }
        RunOutcome::Completed(result) => {
            for (name, job) in &result.results {
                let (mark, detail) = match job.status {
                    JobStatus::Success => (style("✓").green(), String::new()),
                    JobStatus::Failure => (
                        style("✗").red(),
                        format!(" (exit code {})", job.exit_code.unwrap_or(-1)),
                    ),
                    JobStatus::Timeout => (style("✗").red(), " (timed out)".to_string()),
                    JobStatus::Cancelled => (style("⏭").dim(), " (cancelled)".to_string()),
                    JobStatus::EnvironmentFailed => {
                        (style("✗").red(), " (environment failed)".to_string())
                    }
                };
                println!(
                    "  {} {}{} [{:.2}s]",
                    mark,
                    name,
                    detail,
                    job.duration_ms as f64 / 1000.0
                );
            }

            println!();
            match result.status {
                PipelineStatus::Success => println!(
                    "{} Pipeline completed successfully in {:.2}s",
                    style("✓").green().bold(),
                    report.duration_ms as f64 / 1000.0
                ),
                PipelineStatus::Failure => println!(
                    "{} Pipeline failed after {:.2}s",
                    style("✗").red().bold(),
                    report.duration_ms as f64 / 1000.0
                ),
            }
        }
    }
}

fn exit_code_for(report: &RunReport) -> ExitCode {
    if report.outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_pipeline_rejects_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gantry.yaml");
        std::fs::write(&path, "name: ci\njobs: []\n").unwrap();
        assert!(load_pipeline(&path).is_err());
    }

    #[test]
    fn test_load_pipeline_accepts_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gantry.yaml");
        std::fs::write(
            &path,
            "name: ci\njobs:\n  - name: check\n    run: cargo check\n",
        )
        .unwrap();
        let def = load_pipeline(&path).unwrap();
        assert_eq!(def.jobs.len(), 1);
    }

    #[test]
    fn test_missing_explicit_pipeline_path() {
        assert!(find_pipeline_file(Some("/nonexistent/pipeline.yaml")).is_none());
    }
}
