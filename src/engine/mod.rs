// src/engine/mod.rs

//! Bootstrap execution on top of the scheduler state.
//!
//! This module ties together:
//! - the [`jobs`] driver that stores fetched jobs, parks them behind missing
//!   dependencies and executes them once they become runnable
//! - the [`actor`] that owns a scheduler on a blocking worker and serves
//!   async callers through a cloneable [`SchedulerHandle`]

pub mod actor;
pub mod jobs;

pub use actor::{SchedulerHandle, SchedulerTask};
pub use jobs::{DEFAULT_PROGRESS_INTERVAL, Executor, Jobs};
