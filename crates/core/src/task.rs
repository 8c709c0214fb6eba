use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{InvariantViolation, ValidationError};

/// Scheduling discipline, fixed for the lifetime of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Algorithm {
    /// Rate Monotonic: shorter period = higher priority, static.
    #[default]
    #[serde(rename = "RM", alias = "rm")]
    Rm,
    /// Earliest Deadline First: nearest absolute deadline wins, dynamic.
    #[serde(rename = "EDF", alias = "edf")]
    Edf,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Rm => write!(f, "RM"),
            Algorithm::Edf => write!(f, "EDF"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RM" => Ok(Algorithm::Rm),
            "EDF" => Ok(Algorithm::Edf),
            other => Err(format!("unknown algorithm '{other}', expected RM or EDF")),
        }
    }
}

/// Raw, unvalidated task parameters as they arrive from a client or the
/// initial task file. Signed so that negative input can be reported as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// `None` asks the registry to pick a name.
    #[serde(default)]
    pub name: Option<String>,
    pub period: i64,
    pub execution_time: i64,
    /// Relative deadline; defaults to `period`.
    #[serde(default)]
    pub deadline: Option<i64>,
}

impl TaskSpec {
    pub fn new(name: Option<&str>, period: i64, execution_time: i64, deadline: Option<i64>) -> Self {
        Self {
            name: name.map(str::to_string),
            period,
            execution_time,
            deadline,
        }
    }

    /// Check the numeric parameters without resolving a name.
    pub fn validate_timing(&self) -> Result<(), ValidationError> {
        if self.period <= 0 {
            return Err(ValidationError::NonPositivePeriod(self.period));
        }
        if self.execution_time <= 0 {
            return Err(ValidationError::NonPositiveExecutionTime(self.execution_time));
        }
        if let Some(d) = self.deadline {
            if d <= 0 {
                return Err(ValidationError::NonPositiveDeadline(d));
            }
        }
        Ok(())
    }
}

/// Immutable periodic task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDefinition {
    pub name: String,
    /// Ticks between consecutive releases.
    pub period: u64,
    /// Ticks of work per instance. May exceed `period` (overload).
    pub execution_time: u64,
    /// Ticks from release to absolute deadline.
    pub relative_deadline: u64,
}

impl TaskDefinition {
    pub fn new(
        name: &str,
        period: i64,
        execution_time: i64,
        deadline: Option<i64>,
    ) -> Result<Self, ValidationError> {
        if !is_valid_name(name) {
            return Err(ValidationError::InvalidName(name.to_string()));
        }
        let spec = TaskSpec::new(Some(name), period, execution_time, deadline);
        spec.validate_timing()?;

        Ok(Self {
            name: name.to_string(),
            period: period as u64,
            execution_time: execution_time as u64,
            relative_deadline: deadline.unwrap_or(period) as u64,
        })
    }

    /// Build a definition from a spec whose name has already been resolved.
    pub fn from_spec(name: &str, spec: &TaskSpec) -> Result<Self, ValidationError> {
        Self::new(name, spec.period, spec.execution_time, spec.deadline)
    }

    /// Processor share `C / T`.
    pub fn utilization(&self) -> f64 {
        self.execution_time as f64 / self.period as f64
    }
}

/// Names travel over a whitespace-delimited protocol.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// One periodic activation of a [`TaskDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstance {
    pub definition: Arc<TaskDefinition>,
    pub release_tick: u64,
    pub absolute_deadline: u64,
    pub remaining_execution: u64,
    /// 1-based release counter of the owning definition.
    pub sequence_number: u64,
}

impl TaskInstance {
    pub fn new(
        definition: Arc<TaskDefinition>,
        release_tick: u64,
        sequence_number: u64,
    ) -> Result<Self, InvariantViolation> {
        let absolute_deadline = release_tick
            .checked_add(definition.relative_deadline)
            .ok_or_else(|| InvariantViolation::ReleaseOverflow {
                task: definition.name.clone(),
                tick: release_tick,
            })?;

        Ok(Self {
            remaining_execution: definition.execution_time,
            definition,
            release_tick,
            absolute_deadline,
            sequence_number,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Run the instance for one tick. Returns `true` when it just completed.
    pub fn execute_one(&mut self) -> Result<bool, InvariantViolation> {
        self.remaining_execution = self.remaining_execution.checked_sub(1).ok_or_else(|| {
            InvariantViolation::ExhaustedInstance {
                task: self.definition.name.clone(),
                sequence: self.sequence_number,
            }
        })?;
        Ok(self.remaining_execution == 0)
    }

    /// Whether the instance still has work at or past its deadline.
    pub fn is_overdue(&self, tick: u64) -> bool {
        self.remaining_execution > 0 && self.absolute_deadline <= tick
    }
}

impl fmt::Display for TaskInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.definition.name, self.sequence_number)
    }
}
