//! CLI command definitions.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a pipeline against an event
    Run(RunArgs),

    /// Validate a pipeline definition file
    Validate {
        /// Path to the pipeline file (defaults to standard locations)
        path: Option<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the pipeline file (defaults to standard locations)
    #[arg(long)]
    pub pipeline: Option<String>,

    /// Kind of triggering event
    #[arg(long, value_enum, default_value_t = EventArg::Manual)]
    pub event: EventArg,

    /// Changed path, repeatable (push / pull_request events)
    #[arg(long = "changed")]
    pub changed_paths: Vec<String>,

    /// Workspace directory (defaults to the current directory)
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Cache directory (defaults to a per-user temp location)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Disable the build cache entirely
    #[arg(long)]
    pub no_cache: bool,

    /// Emit the full run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventArg {
    Push,
    PullRequest,
    Manual,
}
