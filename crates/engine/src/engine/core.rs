use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Notify};
use tracing::info;

use rtsched_core::{Algorithm, TaskDefinition, TaskInstance};

use crate::metrics::EngineMetrics;
use crate::policy::{policy_for, PriorityPolicy, ScheduledInstance};
use crate::registry::{Admission, TaskRegistry};
use crate::report::FinalReport;
use crate::snapshot::{DeadlineMiss, EngineEvent, TickSnapshot};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_SNAPSHOT_BUFFER: usize = 64;

/// Release schedule of one admitted definition.
#[derive(Debug)]
pub(super) struct Tracker {
    pub(super) definition: Arc<TaskDefinition>,
    /// Index in `trackers`; also the policy tie-breaker.
    pub(super) admission_order: usize,
    /// RM key, computed once at admission.
    pub(super) static_priority: u64,
    pub(super) next_release: u64,
    /// Instances released so far; the next sequence number is `releases + 1`.
    pub(super) releases: u64,
}

/// The scheduler engine. Owns the live instance set and drives ticks;
/// definitions reach it only through the [`TaskRegistry`] admission queue.
pub struct Scheduler {
    pub(super) registry: TaskRegistry,
    pub(super) policy: Box<dyn PriorityPolicy>,
    pub(super) trackers: Vec<Tracker>,
    /// Released instances with work left, in release order.
    pub(super) active: Vec<ScheduledInstance>,
    pub(super) event_log: Vec<EngineEvent>,
    pub(super) deadline_misses: Vec<DeadlineMiss>,
    pub(super) metrics: EngineMetrics,
    pub(super) last_tick: Option<u64>,
    pub(super) tick_interval: Duration,
    pub(super) snapshots: broadcast::Sender<Arc<TickSnapshot>>,
    pub(super) shutdown: Arc<Notify>,
}

/// Stops a running [`Scheduler::run`] loop from another task.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    shutdown: Arc<Notify>,
}

impl SchedulerHandle {
    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        // notify_one keeps a permit if the loop is mid-tick.
        self.shutdown.notify_one();
    }
}

impl Scheduler {
    /// Create an engine bound to a registry. The policy follows the
    /// registry's algorithm.
    pub fn new(registry: TaskRegistry) -> Self {
        let (snapshots, _) = broadcast::channel(DEFAULT_SNAPSHOT_BUFFER);
        Self {
            policy: policy_for(registry.algorithm()),
            registry,
            trackers: Vec::new(),
            active: Vec::new(),
            event_log: Vec::new(),
            deadline_misses: Vec::new(),
            metrics: EngineMetrics::default(),
            last_tick: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            snapshots,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Resize the snapshot channel. Existing subscribers are dropped.
    pub fn with_snapshot_buffer(mut self, capacity: usize) -> Self {
        let (snapshots, _) = broadcast::channel(capacity.max(1));
        self.snapshots = snapshots;
        self
    }

    /// Start tracking a definition handed over by the registry.
    pub(super) fn admit(&mut self, admission: Admission, tick: u64) {
        let admission_order = self.trackers.len();
        // Admissions are drained at the boundary of the tick they were
        // accepted for, so this is `tick` itself; never release in the past.
        let next_release = admission.release_tick.max(tick);
        self.metrics.register(&admission.definition.name);
        self.trackers.push(Tracker {
            static_priority: admission.definition.period,
            definition: admission.definition,
            admission_order,
            next_release,
            releases: 0,
        });
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn algorithm(&self) -> Algorithm {
        self.policy.algorithm()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TickSnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Definitions the engine has admitted, in admission order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<TaskDefinition>> {
        self.trackers.iter().map(|t| &t.definition)
    }

    pub fn active_instances(&self) -> impl Iterator<Item = &TaskInstance> {
        self.active.iter().map(|s| &s.instance)
    }

    pub fn event_log(&self) -> &[EngineEvent] {
        &self.event_log
    }

    pub fn deadline_misses(&self) -> &[DeadlineMiss] {
        &self.deadline_misses
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Last tick executed, `None` before the first step.
    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    pub fn report(&self) -> FinalReport {
        FinalReport::from_scheduler(self)
    }
}
