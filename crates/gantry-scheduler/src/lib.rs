//! Pipeline orchestration for Gantry.
//!
//! Control flow: event → trigger gate → concurrent fan-out of the
//! independent job set → result aggregation.

pub mod report;
pub mod scheduler;
pub mod triggers;

pub use report::aggregate;
pub use scheduler::{CancellationSource, CancellationToken, JobScheduler, SchedulerConfig};
pub use triggers::{PathFilter, should_run};
