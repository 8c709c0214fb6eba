use indexmap::IndexMap;
use serde::Serialize;

use crate::snapshot::{EngineEvent, EventKind};

/// Counters for a single task definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskMetrics {
    pub released: u64,
    pub completed: u64,
    pub missed: u64,
    /// Ticks this task held the processor.
    pub executed_ticks: u64,
}

/// Engine counters accumulated over the whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetrics {
    /// Per-task counters, in admission order.
    pub tasks: IndexMap<String, TaskMetrics>,
    pub busy_ticks: u64,
    pub idle_ticks: u64,
}

impl EngineMetrics {
    /// Start tracking a task so it shows up even if it never runs.
    pub fn register(&mut self, task: &str) {
        self.tasks.entry(task.to_string()).or_default();
    }

    pub fn record_event(&mut self, event: &EngineEvent) {
        let entry = self.tasks.entry(event.task.clone()).or_default();
        match event.kind {
            EventKind::Released => entry.released += 1,
            EventKind::Completed => entry.completed += 1,
            EventKind::DeadlineMissed => entry.missed += 1,
        }
    }

    /// Record who held the processor for one tick.
    pub fn record_tick(&mut self, running: Option<&str>) {
        match running {
            Some(task) => {
                self.busy_ticks += 1;
                self.tasks.entry(task.to_string()).or_default().executed_ticks += 1;
            }
            None => self.idle_ticks += 1,
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.busy_ticks + self.idle_ticks
    }

    /// Observed processor utilization (0.0 - 1.0).
    pub fn observed_utilization(&self) -> f64 {
        let total = self.total_ticks();
        if total == 0 {
            0.0
        } else {
            self.busy_ticks as f64 / total as f64
        }
    }

    pub fn total_misses(&self) -> u64 {
        self.tasks.values().map(|t| t.missed).sum()
    }
}
