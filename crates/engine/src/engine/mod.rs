//! Tick-driven scheduler engine.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, admission, and accessor methods
//! - `tick`: the per-tick algorithm (release, miss check, select, execute)
//! - `pacing`: the real-time tick loop and the unpaced batch simulation

mod core;
mod pacing;
mod tick;
#[cfg(test)]
mod tests;

use thiserror::Error;

use rtsched_core::InvariantViolation;

use crate::registry::RegistryError;

pub use self::core::{Scheduler, SchedulerHandle};

/// Errors that stop the tick loop.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("registry unavailable: {0}")]
    Registry(#[from] RegistryError),
}
