//! Task registry gateway shared by the tick loop and client sessions.
//!
//! All access goes through [`TaskRegistry`]. The lock is held for a single
//! lookup, insert or drain and never across a tick or an `.await`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use rtsched_core::{Algorithm, TaskDefinition, TaskSpec, ValidationError};

/// Names that ask the registry to generate `T<n>`.
const AUTO_NAMES: &[&str] = &["auto", "-"];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error("registry lock poisoned")]
    Poisoned,
}

/// An accepted task, waiting for the engine's next tick boundary.
#[derive(Debug, Clone)]
pub struct Admission {
    pub definition: Arc<TaskDefinition>,
    /// First release; equals `current_tick` at acceptance.
    pub release_tick: u64,
}

/// Point-in-time view answered to `STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub current_tick: u64,
    pub algorithm: Algorithm,
    pub task_count: usize,
    pub active_count: usize,
    pub deadline_miss_count: usize,
}

#[derive(Debug, Default)]
struct Registry {
    /// Next tick to be dispatched.
    current_tick: u64,
    definitions: IndexMap<String, Arc<TaskDefinition>>,
    pending: VecDeque<Admission>,
    active_count: usize,
    deadline_miss_count: usize,
    auto_counter: u64,
}

impl Registry {
    fn resolve_name(&mut self, requested: Option<&str>) -> String {
        match requested {
            Some(name) if !AUTO_NAMES.contains(&name) => name.to_string(),
            _ => loop {
                self.auto_counter += 1;
                let candidate = format!("T{}", self.auto_counter);
                if !self.definitions.contains_key(&candidate) {
                    break candidate;
                }
            },
        }
    }

    fn admit(&mut self, definition: TaskDefinition) -> Result<Admission, ValidationError> {
        if self.definitions.contains_key(&definition.name) {
            return Err(ValidationError::DuplicateName(definition.name));
        }

        let definition = Arc::new(definition);
        let admission = Admission {
            definition: Arc::clone(&definition),
            release_tick: self.current_tick,
        };
        self.definitions.insert(definition.name.clone(), definition);
        self.pending.push_back(admission.clone());
        Ok(admission)
    }
}

fn log_admission(admission: &Admission) {
    info!(
        task = %admission.definition.name,
        period = admission.definition.period,
        execution_time = admission.definition.execution_time,
        deadline = admission.definition.relative_deadline,
        release_tick = admission.release_tick,
        "task admitted"
    );
}

/// Cloneable handle to the shared task registry.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    algorithm: Algorithm,
    inner: Arc<Mutex<Registry>>,
}

impl TaskRegistry {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            inner: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>, RegistryError> {
        self.inner.lock().map_err(|_| RegistryError::Poisoned)
    }

    /// Validate and register a task. It is released for the first time at
    /// the `current_tick` observed here.
    pub fn add_task(&self, spec: TaskSpec) -> Result<Admission, RegistryError> {
        // Timing is checked before a name is generated so that a rejected
        // request does not consume an auto-name.
        spec.validate_timing()?;

        let admission = {
            let mut reg = self.lock()?;
            let name = reg.resolve_name(spec.name.as_deref());
            let definition = TaskDefinition::from_spec(&name, &spec)?;
            reg.admit(definition)?
        };
        log_admission(&admission);
        Ok(admission)
    }

    /// Register an already validated definition (initial task file) under
    /// its literal name; `auto` and `-` are not expanded here.
    pub fn add_definition(&self, definition: TaskDefinition) -> Result<Admission, RegistryError> {
        let admission = self.lock()?.admit(definition)?;
        log_admission(&admission);
        Ok(admission)
    }

    /// All definitions in insertion order.
    pub fn list_tasks(&self) -> Result<Vec<Arc<TaskDefinition>>, RegistryError> {
        Ok(self.lock()?.definitions.values().cloned().collect())
    }

    pub fn status(&self) -> Result<StatusReport, RegistryError> {
        let reg = self.lock()?;
        Ok(StatusReport {
            current_tick: reg.current_tick,
            algorithm: self.algorithm,
            task_count: reg.definitions.len(),
            active_count: reg.active_count,
            deadline_miss_count: reg.deadline_miss_count,
        })
    }

    /// Claim the next tick: returns its number plus every admission accepted
    /// before it, and advances the clock in the same critical section.
    pub(crate) fn begin_tick(&self) -> Result<(u64, Vec<Admission>), RegistryError> {
        let mut reg = self.lock()?;
        let tick = reg.current_tick;
        let admitted = reg.pending.drain(..).collect();
        reg.current_tick = tick + 1;
        Ok((tick, admitted))
    }

    /// Publish the engine's counters after a tick.
    pub(crate) fn publish(&self, active_count: usize, deadline_miss_count: usize) -> Result<(), RegistryError> {
        let mut reg = self.lock()?;
        reg.active_count = active_count;
        reg.deadline_miss_count = deadline_miss_count;
        Ok(())
    }
}
