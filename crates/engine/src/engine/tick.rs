use std::sync::Arc;

use tracing::{debug, trace, warn};

use rtsched_core::{InvariantViolation, TaskInstance};

use crate::policy::ScheduledInstance;
use crate::snapshot::{DeadlineMiss, EngineEvent, EventKind, TaskState, TaskTickState, TickSnapshot};

use super::{EngineError, Scheduler};

impl Scheduler {
    /// Execute exactly one tick and return its snapshot.
    ///
    /// The registry lock is taken twice, briefly: once to claim the tick and
    /// drain admissions, once to publish counters. Everything in between
    /// works on engine-owned state.
    pub fn step(&mut self) -> Result<TickSnapshot, EngineError> {
        let (tick, admitted) = self.registry.begin_tick()?;
        if let Some(previous) = self.last_tick {
            if tick != previous + 1 {
                return Err(InvariantViolation::NonMonotonicTick { previous, got: tick }.into());
            }
        }
        for admission in admitted {
            self.admit(admission, tick);
        }

        let mut events = Vec::new();
        let mut released = vec![false; self.trackers.len()];
        let mut missed = vec![false; self.trackers.len()];

        // 1. Release
        for tracker in self.trackers.iter_mut().filter(|t| t.next_release == tick) {
            tracker.releases += 1;
            let instance = TaskInstance::new(Arc::clone(&tracker.definition), tick, tracker.releases)?;
            tracker.next_release = tick.checked_add(tracker.definition.period).ok_or_else(|| {
                InvariantViolation::ReleaseOverflow {
                    task: tracker.definition.name.clone(),
                    tick,
                }
            })?;

            events.push(EngineEvent::new(tick, EventKind::Released, &instance));
            released[tracker.admission_order] = true;
            self.active.push(ScheduledInstance {
                instance,
                admission_order: tracker.admission_order,
                static_priority: tracker.static_priority,
            });
        }

        // 2. Miss check: overdue instances leave the ready set for good.
        let misses = &mut self.deadline_misses;
        self.active.retain(|scheduled| {
            let instance = &scheduled.instance;
            if !instance.is_overdue(tick) {
                return true;
            }
            events.push(EngineEvent::new(tick, EventKind::DeadlineMissed, instance));
            missed[scheduled.admission_order] = true;
            misses.push(DeadlineMiss {
                task: instance.definition.name.clone(),
                sequence: instance.sequence_number,
                release_tick: instance.release_tick,
                absolute_deadline: instance.absolute_deadline,
                remaining_execution: instance.remaining_execution,
            });
            false
        });

        // 3. Selection + 4. Execution
        let mut running = None;
        let mut executing = None;
        if let Some(idx) = self.policy.select(&self.active) {
            let scheduled = &mut self.active[idx];
            let completed = scheduled.instance.execute_one()?;
            running = Some(scheduled.instance.to_string());
            executing = Some(scheduled.admission_order);

            if completed {
                let done = self.active.remove(idx);
                events.push(EngineEvent::new(tick, EventKind::Completed, &done.instance));
            }
        }

        // 5. Snapshot
        let tasks = self
            .trackers
            .iter()
            .map(|tracker| {
                let order = tracker.admission_order;
                let state = if executing == Some(order) {
                    TaskState::Executing
                } else if self.active.iter().any(|s| s.admission_order == order) {
                    TaskState::Ready
                } else {
                    TaskState::Idle
                };
                TaskTickState {
                    task: tracker.definition.name.clone(),
                    state,
                    released: released[order],
                    deadline_missed: missed[order],
                }
            })
            .collect();

        let running_task = executing.map(|order| self.trackers[order].definition.name.clone());
        self.metrics.record_tick(running_task.as_deref());
        for event in &events {
            self.metrics.record_event(event);
            match event.kind {
                EventKind::DeadlineMissed => warn!(tick, task = %event.task, "{event}"),
                _ => debug!(tick, task = %event.task, "{event}"),
            }
        }
        self.event_log.extend(events.iter().cloned());

        // 6. Publish
        self.registry.publish(self.active.len(), self.deadline_misses.len())?;
        self.last_tick = Some(tick);
        trace!(tick, running = ?running, active = self.active.len(), "tick complete");

        Ok(TickSnapshot {
            tick,
            algorithm: self.policy.algorithm(),
            running,
            tasks,
            events,
        })
    }
}
