pub mod engine;
pub mod gantt;
pub mod metrics;
pub mod policy;
pub mod registry;
pub mod report;
pub mod snapshot;

pub use engine::{EngineError, Scheduler, SchedulerHandle};
pub use gantt::GanttChart;
pub use metrics::{EngineMetrics, TaskMetrics};
pub use policy::{EarliestDeadlineFirst, PriorityPolicy, RateMonotonic, ScheduledInstance};
pub use registry::{Admission, RegistryError, StatusReport, TaskRegistry};
pub use report::{liu_layland_bound, FinalReport, Schedulability, TaskReport};
pub use snapshot::{
    CellSymbol, DeadlineMiss, EngineEvent, EventKind, TaskState, TaskTickState, TickSnapshot,
};
