//! Task execution boundary for Gantry.
//!
//! The orchestrator treats a job's command as an opaque external
//! invocation; this crate defines that boundary and ships a shell
//! implementation plus scoped execution environments.

pub mod environments;
pub mod runner;
pub mod shell;

pub use environments::{Environment, EnvironmentFactory, HostEnvironment, HostEnvironmentFactory};
pub use runner::{RunnerConfig, TaskContext, TaskOutcome, TaskRunner};
pub use shell::ShellRunner;
