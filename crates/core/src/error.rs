use std::path::PathBuf;

use thiserror::Error;

/// Rejected task parameters. Reported to the requester only; the scheduler
/// state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("period must be positive, got {0}")]
    NonPositivePeriod(i64),

    #[error("execution_time must be positive, got {0}")]
    NonPositiveExecutionTime(i64),

    #[error("deadline must be positive, got {0}")]
    NonPositiveDeadline(i64),

    #[error("invalid task name '{0}'")]
    InvalidName(String),

    #[error("task '{0}' already exists")]
    DuplicateName(String),
}

/// A broken internal invariant of the tick algorithm. Never reachable
/// through external input; fatal to the tick loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{task}[{sequence}] selected with no remaining execution")]
    ExhaustedInstance { task: String, sequence: u64 },

    #[error("release tick arithmetic overflowed for {task} at tick {tick}")]
    ReleaseOverflow { task: String, tick: u64 },

    #[error("tick {got} does not follow tick {previous}")]
    NonMonotonicTick { previous: u64, got: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read task file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed task JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task #{index} has no name")]
    MissingName { index: usize },

    #[error("task #{index} ('{name}'): {source}")]
    Invalid {
        index: usize,
        name: String,
        #[source]
        source: ValidationError,
    },
}
