//! # wbs-core
//!
//! Core types for the WBS work-breakdown generator.
//!
//! A project description is broken down level by level into a fixed
//! four-level hierarchy below the project root:
//!
//! - Project → Epic → Feature → Story → Task
//! - Children keep generation order; generation only ever appends
//! - Every non-root node points back at its parent through `parent_id`
//! - Batch ids embed a monotonic batch stamp so they never collide

mod clock;
mod config;
mod error;
mod types;

pub use clock::BatchClock;
pub use config::{BatchPolicy, GenerationConfig, ModelConfig, WbsConfig};
pub use error::{ErrorKind, Result, WbsError};
pub use types::*;
