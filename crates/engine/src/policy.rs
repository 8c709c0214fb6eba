//! Priority policies: which ready instance runs this tick.
//!
//! A policy maps each instance to a numeric key (lower = higher priority).
//! Ties are broken by admission order, then release tick, then sequence
//! number, so every selection is reproducible.

use rtsched_core::{Algorithm, TaskInstance};

/// A live instance together with the scheduling data of its definition.
#[derive(Debug, Clone)]
pub struct ScheduledInstance {
    pub instance: TaskInstance,
    /// Position of the owning definition in admission order.
    pub admission_order: usize,
    /// RM key, fixed when the definition was admitted.
    pub static_priority: u64,
}

impl ScheduledInstance {
    fn tie_break(&self) -> (usize, u64, u64) {
        (
            self.admission_order,
            self.instance.release_tick,
            self.instance.sequence_number,
        )
    }
}

/// Orders the ready set for a scheduling discipline.
pub trait PriorityPolicy: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Priority key of an instance. Lower value = higher priority.
    fn priority_key(&self, scheduled: &ScheduledInstance) -> u64;

    /// Index of the highest-priority instance with work left, if any.
    fn select(&self, ready: &[ScheduledInstance]) -> Option<usize> {
        ready
            .iter()
            .enumerate()
            .filter(|(_, s)| s.instance.remaining_execution > 0)
            .min_by_key(|(_, s)| (self.priority_key(s), s.tie_break()))
            .map(|(idx, _)| idx)
    }
}

/// Static priority by period.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateMonotonic;

impl PriorityPolicy for RateMonotonic {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Rm
    }

    fn priority_key(&self, scheduled: &ScheduledInstance) -> u64 {
        scheduled.static_priority
    }
}

/// Dynamic priority by absolute deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestDeadlineFirst;

impl PriorityPolicy for EarliestDeadlineFirst {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Edf
    }

    fn priority_key(&self, scheduled: &ScheduledInstance) -> u64 {
        scheduled.instance.absolute_deadline
    }
}

/// Build the policy for an algorithm.
pub fn policy_for(algorithm: Algorithm) -> Box<dyn PriorityPolicy> {
    match algorithm {
        Algorithm::Rm => Box::new(RateMonotonic),
        Algorithm::Edf => Box::new(EarliestDeadlineFirst),
    }
}
