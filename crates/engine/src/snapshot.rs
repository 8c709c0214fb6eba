//! Per-tick output of the engine, consumed by renderers and logs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use rtsched_core::{Algorithm, TaskInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Released,
    Completed,
    DeadlineMissed,
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineEvent {
    pub tick: u64,
    pub kind: EventKind,
    pub task: String,
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
}

impl EngineEvent {
    pub(crate) fn new(tick: u64, kind: EventKind, instance: &TaskInstance) -> Self {
        Self {
            tick,
            kind,
            task: instance.definition.name.clone(),
            sequence: instance.sequence_number,
            recorded_at: Utc::now(),
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            EventKind::Released => "released",
            EventKind::Completed => "completed",
            EventKind::DeadlineMissed => "missed deadline",
        };
        write!(f, "{}[{}] {} at tick {}", self.task, self.sequence, verb, self.tick)
    }
}

/// A permanent deadline miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineMiss {
    pub task: String,
    pub sequence: u64,
    pub release_tick: u64,
    pub absolute_deadline: u64,
    pub remaining_execution: u64,
}

impl fmt::Display for DeadlineMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] missed its deadline at t={} ({} tick(s) of work left)",
            self.task, self.sequence, self.absolute_deadline, self.remaining_execution
        )
    }
}

/// State of one definition during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    Executing,
    Ready,
    Idle,
}

/// Gantt cell symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellSymbol {
    Executing,
    Ready,
    Idle,
    Release,
    Deadline,
}

impl CellSymbol {
    pub fn as_char(self) -> char {
        match self {
            CellSymbol::Executing => '#',
            CellSymbol::Ready => '-',
            CellSymbol::Idle => '.',
            CellSymbol::Release => '^',
            CellSymbol::Deadline => '!',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTickState {
    pub task: String,
    pub state: TaskState,
    /// An instance of this task was released this tick.
    pub released: bool,
    /// An instance of this task missed its deadline this tick.
    pub deadline_missed: bool,
}

impl TaskTickState {
    /// A miss outranks execution, which outranks a release marker.
    pub fn symbol(&self) -> CellSymbol {
        if self.deadline_missed {
            CellSymbol::Deadline
        } else if self.state == TaskState::Executing {
            CellSymbol::Executing
        } else if self.released {
            CellSymbol::Release
        } else if self.state == TaskState::Ready {
            CellSymbol::Ready
        } else {
            CellSymbol::Idle
        }
    }
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub algorithm: Algorithm,
    /// `name[seq]` of the instance that ran, `None` when idle.
    pub running: Option<String>,
    /// One entry per definition, in admission order.
    pub tasks: Vec<TaskTickState>,
    pub events: Vec<EngineEvent>,
}

impl TickSnapshot {
    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    pub fn state_of(&self, task: &str) -> Option<&TaskTickState> {
        self.tasks.iter().find(|t| t.task == task)
    }

    /// Name of the definition that ran, without the sequence suffix.
    pub fn running_task(&self) -> Option<&str> {
        self.tasks
            .iter()
            .find(|t| t.state == TaskState::Executing)
            .map(|t| t.task.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(state: TaskState, released: bool, missed: bool) -> TaskTickState {
        TaskTickState {
            task: "T1".into(),
            state,
            released,
            deadline_missed: missed,
        }
    }

    #[test]
    fn symbol_precedence() {
        assert_eq!(cell(TaskState::Executing, true, true).symbol(), CellSymbol::Deadline);
        assert_eq!(cell(TaskState::Executing, true, false).symbol(), CellSymbol::Executing);
        assert_eq!(cell(TaskState::Ready, true, false).symbol(), CellSymbol::Release);
        assert_eq!(cell(TaskState::Ready, false, false).symbol(), CellSymbol::Ready);
        assert_eq!(cell(TaskState::Idle, false, false).symbol(), CellSymbol::Idle);
    }

    #[test]
    fn event_text() {
        let event = EngineEvent {
            tick: 4,
            kind: EventKind::DeadlineMissed,
            task: "T2".into(),
            sequence: 1,
            recorded_at: Utc::now(),
        };
        assert_eq!(event.to_string(), "T2[1] missed deadline at tick 4");
    }
}
