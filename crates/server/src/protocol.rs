//! Line-oriented text protocol spoken by client sessions.
//!
//! One command per line, verbs case-insensitive:
//!
//! ```text
//! ADD <name|auto|-> <period> <execution_time> [deadline]
//! STATUS
//! LIST
//! ```

use std::fmt::Write as _;

use thiserror::Error;

use rtsched_core::{Algorithm, TaskDefinition, TaskSpec};
use rtsched_engine::{Admission, StatusReport};

/// Longest accepted command line, excluding the terminator.
pub const MAX_LINE_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(TaskSpec),
    Status,
    List,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownVerb(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{field} must be an integer, got '{value}'")]
    BadInteger { field: &'static str, value: String },

    #[error("line exceeds 1024 bytes")]
    LineTooLong,

    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

const ADD_USAGE: &str = "ADD <name|auto> <period> <execution_time> [deadline]";

impl Command {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ProtocolError::Empty)?;
        let args: Vec<&str> = words.collect();

        match verb.to_ascii_uppercase().as_str() {
            "ADD" => parse_add(&args),
            "STATUS" if args.is_empty() => Ok(Command::Status),
            "STATUS" => Err(ProtocolError::Usage("STATUS")),
            "LIST" if args.is_empty() => Ok(Command::List),
            "LIST" => Err(ProtocolError::Usage("LIST")),
            _ => Err(ProtocolError::UnknownVerb(verb.to_string())),
        }
    }
}

fn parse_add(args: &[&str]) -> Result<Command, ProtocolError> {
    let (name, period, exec, deadline) = match *args {
        [name, period, exec] => (name, period, exec, None),
        [name, period, exec, deadline] => (name, period, exec, Some(deadline)),
        _ => return Err(ProtocolError::Usage(ADD_USAGE)),
    };

    let name = if name.eq_ignore_ascii_case("auto") || name == "-" {
        None
    } else {
        Some(name)
    };
    let deadline = deadline.map(|d| integer("deadline", d)).transpose()?;

    Ok(Command::Add(TaskSpec::new(
        name,
        integer("period", period)?,
        integer("execution_time", exec)?,
        deadline,
    )))
}

fn integer(field: &'static str, value: &str) -> Result<i64, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::BadInteger {
        field,
        value: value.to_string(),
    })
}

// ── Responses ───────────────────────────────────────────────────────

pub fn greeting(algorithm: Algorithm) -> String {
    format!("HELLO rtsched algorithm={algorithm}")
}

pub fn ok_added(admission: &Admission) -> String {
    let def = &admission.definition;
    format!(
        "OK {} period={} execution_time={} deadline={} release_tick={}",
        def.name, def.period, def.execution_time, def.relative_deadline, admission.release_tick
    )
}

pub fn error(reason: impl std::fmt::Display) -> String {
    format!("ERROR {reason}")
}

pub fn status(report: &StatusReport) -> String {
    format!(
        "STATUS current_tick={} algorithm={} task_count={} active_count={} deadline_miss_count={}",
        report.current_tick,
        report.algorithm,
        report.task_count,
        report.active_count,
        report.deadline_miss_count
    )
}

/// `TASKS <n>` followed by exactly `n` lines.
pub fn task_list<D: AsRef<TaskDefinition>>(tasks: &[D]) -> String {
    let mut out = format!("TASKS {}", tasks.len());
    for def in tasks.iter().map(AsRef::as_ref) {
        let _ = write!(
            out,
            "\n{} period={} execution_time={} deadline={}",
            def.name, def.period, def.execution_time, def.relative_deadline
        );
    }
    out
}
