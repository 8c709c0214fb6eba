//! End-of-run summary printed when a server stops or a batch simulation ends.

use std::fmt;

use serde::Serialize;

use rtsched_core::Algorithm;

use crate::engine::Scheduler;
use crate::metrics::TaskMetrics;
use crate::snapshot::DeadlineMiss;

/// Liu & Layland utilization bound for `n` tasks under RM: `n(2^(1/n) - 1)`.
///
/// Returns `0.0` for `n = 0` and `1.0` for `n = 1`.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    nf * (2.0_f64.powf(1.0 / nf) - 1.0)
}

/// Outcome of the utilization-based schedulability test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Schedulability {
    /// The test proves no deadline will be missed.
    Guaranteed,
    /// The test cannot decide; the simulation is the evidence.
    Inconclusive,
    /// Total utilization exceeds one processor.
    Overloaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub period: u64,
    pub execution_time: u64,
    pub deadline: u64,
    pub utilization: f64,
    pub metrics: TaskMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub algorithm: Algorithm,
    pub ticks: u64,
    pub tasks: Vec<TaskReport>,
    pub total_utilization: f64,
    pub liu_layland_bound: f64,
    /// Share of ticks the processor was busy.
    pub observed_utilization: f64,
    pub misses: Vec<DeadlineMiss>,
}

impl FinalReport {
    pub fn from_scheduler(scheduler: &Scheduler) -> Self {
        let metrics = scheduler.metrics();
        let tasks: Vec<TaskReport> = scheduler
            .definitions()
            .map(|def| TaskReport {
                name: def.name.clone(),
                period: def.period,
                execution_time: def.execution_time,
                deadline: def.relative_deadline,
                utilization: def.utilization(),
                metrics: metrics.tasks.get(&def.name).cloned().unwrap_or_default(),
            })
            .collect();

        Self {
            algorithm: scheduler.algorithm(),
            ticks: metrics.total_ticks(),
            total_utilization: tasks.iter().map(|t| t.utilization).sum(),
            liu_layland_bound: liu_layland_bound(tasks.len()),
            observed_utilization: metrics.observed_utilization(),
            misses: scheduler.deadline_misses().to_vec(),
            tasks,
        }
    }

    pub fn schedulability(&self) -> Schedulability {
        if self.total_utilization > 1.0 {
            return Schedulability::Overloaded;
        }
        // Both bounds assume deadlines equal to periods.
        if self.tasks.iter().any(|t| t.deadline < t.period) {
            return Schedulability::Inconclusive;
        }
        match self.algorithm {
            Algorithm::Edf => Schedulability::Guaranteed,
            Algorithm::Rm if self.total_utilization <= self.liu_layland_bound => {
                Schedulability::Guaranteed
            }
            Algorithm::Rm => Schedulability::Inconclusive,
        }
    }
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Final report ({}, {} ticks) ===", self.algorithm, self.ticks)?;
        writeln!(
            f,
            "{:<10} {:>6} {:>5} {:>8} {:>6} {:>8} {:>9} {:>6}",
            "Task", "Period", "Exec", "Deadline", "U", "Released", "Completed", "Missed"
        )?;
        for t in &self.tasks {
            writeln!(
                f,
                "{:<10} {:>6} {:>5} {:>8} {:>6.3} {:>8} {:>9} {:>6}",
                t.name,
                t.period,
                t.execution_time,
                t.deadline,
                t.utilization,
                t.metrics.released,
                t.metrics.completed,
                t.metrics.missed
            )?;
        }
        writeln!(
            f,
            "Utilization: {:.3} (bound {:.3}, observed {:.3}) -> {:?}",
            self.total_utilization,
            match self.algorithm {
                Algorithm::Rm => self.liu_layland_bound,
                Algorithm::Edf => 1.0,
            },
            self.observed_utilization,
            self.schedulability()
        )?;
        writeln!(f, "Deadline misses: {}", self.misses.len())?;
        for miss in &self.misses {
            writeln!(f, "  {miss}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rtsched_core::TaskSpec;

    use super::*;
    use crate::registry::TaskRegistry;

    fn report(algorithm: Algorithm, tasks: &[(&str, i64, i64, Option<i64>)], ticks: u64) -> FinalReport {
        let registry = TaskRegistry::new(algorithm);
        for (name, p, e, d) in tasks {
            registry.add_task(TaskSpec::new(Some(name), *p, *e, *d)).unwrap();
        }
        let mut s = Scheduler::new(registry);
        s.simulate(ticks).unwrap();
        s.report()
    }

    #[test]
    fn liu_layland_values() {
        assert_eq!(liu_layland_bound(0), 0.0);
        assert!((liu_layland_bound(1) - 1.0).abs() < 1e-12);
        assert!((liu_layland_bound(2) - 0.8284).abs() < 1e-3);
        assert!(liu_layland_bound(50) > std::f64::consts::LN_2);
    }

    #[test]
    fn verdicts() {
        let light = report(Algorithm::Rm, &[("A", 4, 1, None), ("B", 5, 1, None)], 1);
        assert_eq!(light.schedulability(), Schedulability::Guaranteed);

        let tight_rm = report(Algorithm::Rm, &[("A", 4, 2, None), ("B", 6, 3, None)], 1);
        assert_eq!(tight_rm.schedulability(), Schedulability::Inconclusive);

        let tight_edf = report(Algorithm::Edf, &[("A", 4, 2, None), ("B", 6, 3, None)], 1);
        assert_eq!(tight_edf.schedulability(), Schedulability::Guaranteed);

        let constrained = report(Algorithm::Edf, &[("A", 4, 1, Some(2))], 1);
        assert_eq!(constrained.schedulability(), Schedulability::Inconclusive);

        let overloaded = report(Algorithm::Edf, &[("A", 4, 3, None), ("B", 6, 4, None)], 1);
        assert_eq!(overloaded.schedulability(), Schedulability::Overloaded);
    }

    #[test]
    fn counters_come_from_the_run() {
        let r = report(Algorithm::Rm, &[("A", 4, 1, None)], 8);
        assert_eq!(r.ticks, 8);
        assert_eq!(r.tasks[0].metrics.released, 2);
        assert_eq!(r.tasks[0].metrics.completed, 2);
        assert!((r.observed_utilization - 0.25).abs() < 1e-9);
    }
}
