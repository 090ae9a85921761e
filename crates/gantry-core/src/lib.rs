//! Gantry Core
//!
//! Core domain types and error handling for the Gantry pipeline
//! orchestrator. This crate has minimal dependencies and defines the
//! shared vocabulary used across all other crates.

pub mod error;
pub mod event;
pub mod ids;
pub mod job;
pub mod pipeline;

pub use error::{Error, Result};
pub use ids::*;
