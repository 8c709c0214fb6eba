use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rtsched_core::{Algorithm, InvariantViolation, TaskSpec};

use crate::engine::{EngineError, Scheduler};
use crate::registry::TaskRegistry;
use crate::snapshot::{EventKind, TaskState};

fn scheduler(algorithm: Algorithm, tasks: &[(&str, i64, i64, Option<i64>)]) -> Scheduler {
    let registry = TaskRegistry::new(algorithm);
    for (name, period, exec, deadline) in tasks {
        registry
            .add_task(TaskSpec::new(Some(name), *period, *exec, *deadline))
            .unwrap();
    }
    Scheduler::new(registry)
}

fn release_ticks(s: &Scheduler, task: &str) -> Vec<u64> {
    s.event_log()
        .iter()
        .filter(|e| e.task == task && e.kind == EventKind::Released)
        .map(|e| e.tick)
        .collect()
}

#[test]
fn tick_advances_by_exactly_one() {
    let mut s = scheduler(Algorithm::Rm, &[("A", 3, 1, None)]);
    for expected in 0..5 {
        assert_eq!(s.step().unwrap().tick, expected);
    }
    assert_eq!(s.last_tick(), Some(4));
    assert_eq!(s.registry().status().unwrap().current_tick, 5);
}

#[test]
fn empty_task_set_idles() {
    let mut s = scheduler(Algorithm::Edf, &[]);
    let snap = s.step().unwrap();
    assert!(snap.is_idle());
    assert!(snap.tasks.is_empty());
    assert_eq!(s.metrics().idle_ticks, 1);
}

#[test]
fn releases_happen_at_multiples_of_the_period() {
    let mut s = scheduler(Algorithm::Rm, &[("A", 3, 1, None)]);
    s.simulate(10).unwrap();
    assert_eq!(release_ticks(&s, "A"), vec![0, 3, 6, 9]);

    let texts: Vec<String> = s.event_log().iter().map(|e| e.to_string()).collect();
    assert_eq!(texts[0], "A[1] released at tick 0");
    assert_eq!(texts[1], "A[1] completed at tick 0");
}

#[test]
fn releases_ignore_previous_misses() {
    // Overloaded on its own: every instance misses, releases stay periodic.
    let mut s = scheduler(Algorithm::Rm, &[("A", 2, 3, None)]);
    s.simulate(9).unwrap();
    assert_eq!(release_ticks(&s, "A"), vec![0, 2, 4, 6, 8]);
    assert_eq!(s.deadline_misses().len(), 4);
}

#[test]
fn miss_recorded_exactly_at_absolute_deadline() {
    // Needs 3 ticks but has 2.
    let mut s = scheduler(Algorithm::Rm, &[("A", 4, 3, Some(2))]);
    let snaps = s.simulate(3).unwrap();

    assert!(snaps[0].events.iter().all(|e| e.kind != EventKind::DeadlineMissed));
    assert!(snaps[1].events.iter().all(|e| e.kind != EventKind::DeadlineMissed));
    let miss = snaps[2]
        .events
        .iter()
        .find(|e| e.kind == EventKind::DeadlineMissed)
        .expect("miss at tick 2");
    assert_eq!(miss.to_string(), "A[1] missed deadline at tick 2");
    assert!(snaps[2].state_of("A").unwrap().deadline_missed);

    let recorded = &s.deadline_misses()[0];
    assert_eq!(recorded.absolute_deadline, 2);
    assert_eq!(recorded.remaining_execution, 1);
    // The missed instance is gone for good.
    assert!(snaps[2].is_idle());
}

#[test]
fn finishing_the_tick_before_the_deadline_is_not_a_miss() {
    let mut s = scheduler(Algorithm::Edf, &[("A", 4, 2, Some(2))]);
    s.simulate(8).unwrap();
    assert!(s.deadline_misses().is_empty());
    assert_eq!(s.metrics().tasks["A"].completed, 2);
}

#[test]
fn rm_shorter_period_always_wins_contention() {
    let mut s = scheduler(Algorithm::Rm, &[("long", 6, 4, None), ("short", 4, 3, None)]);
    for snap in s.simulate(24).unwrap() {
        let short = snap.state_of("short").unwrap().state;
        let long = snap.state_of("long").unwrap().state;
        assert!(
            !(long == TaskState::Executing && short == TaskState::Ready),
            "long ran while short was ready at tick {}",
            snap.tick
        );
    }
}

#[test]
fn rm_overloaded_set_misses_within_hyperperiod() {
    // U = 3/4 + 4/6 ~ 1.417
    let mut s = scheduler(Algorithm::Rm, &[("A", 4, 3, None), ("B", 6, 4, None)]);
    s.simulate(12).unwrap();
    assert!(!s.deadline_misses().is_empty());

    let first = &s.deadline_misses()[0];
    assert_eq!(first.task, "B");
    assert_eq!(first.absolute_deadline, 6);
    assert_eq!(s.registry().status().unwrap().deadline_miss_count, s.deadline_misses().len());
}

#[test]
fn edf_full_utilization_set_never_misses() {
    // U = 2/4 + 3/6 = 1.0
    let mut s = scheduler(Algorithm::Edf, &[("A", 4, 2, Some(4)), ("B", 6, 3, None)]);
    s.simulate(240).unwrap();
    assert!(s.deadline_misses().is_empty());
    assert_eq!(s.metrics().idle_ticks, 0);
}

#[test]
fn edf_and_rm_disagree_on_constrained_deadline() {
    let tasks = [("A", 10, 2, Some(3)), ("B", 4, 2, None)];

    let mut edf = scheduler(Algorithm::Edf, &tasks);
    let snaps = edf.simulate(4).unwrap();
    assert_eq!(snaps[0].running_task(), Some("A"));
    assert_eq!(snaps[1].running_task(), Some("A"));
    assert_eq!(snaps[2].running_task(), Some("B"));
    assert!(edf.deadline_misses().is_empty());

    let mut rm = scheduler(Algorithm::Rm, &tasks);
    let snaps = rm.simulate(4).unwrap();
    assert_eq!(snaps[0].running_task(), Some("B"));
    assert_eq!(rm.deadline_misses()[0].task, "A");
    assert_eq!(rm.deadline_misses()[0].absolute_deadline, 3);
}

#[test]
fn edf_ties_break_by_admission_order() {
    // Identical parameters: the first admitted task always runs first.
    let mut s = scheduler(Algorithm::Edf, &[("first", 4, 1, None), ("second", 4, 1, None)]);
    let snaps = s.simulate(8).unwrap();
    assert_eq!(snaps[0].running.as_deref(), Some("first[1]"));
    assert_eq!(snaps[1].running.as_deref(), Some("second[1]"));
    assert_eq!(snaps[4].running.as_deref(), Some("first[2]"));
}

#[test]
fn overlapping_instances_coexist() {
    // Deadline longer than period: a backlog builds up instead of replacing.
    let mut s = scheduler(Algorithm::Rm, &[("A", 1, 2, Some(10))]);
    s.simulate(3).unwrap();

    let sequences: Vec<u64> = s.active_instances().map(|i| i.sequence_number).collect();
    assert!(sequences.len() >= 2, "expected a backlog, got {sequences:?}");
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn tasks_added_mid_run_start_at_the_acceptance_tick() {
    let mut s = scheduler(Algorithm::Rm, &[]);
    s.simulate(3).unwrap();

    let admission = s
        .registry()
        .add_task(TaskSpec::new(Some("late"), 5, 1, None))
        .unwrap();
    assert_eq!(admission.release_tick, 3);

    s.simulate(10).unwrap();
    assert_eq!(release_ticks(&s, "late"), vec![3, 8]);
}

#[test]
fn rejected_add_leaves_no_event() {
    let mut s = scheduler(Algorithm::Rm, &[]);
    assert!(s.registry().add_task(TaskSpec::new(None, 0, 1, None)).is_err());
    assert!(s.registry().add_task(TaskSpec::new(None, 4, 0, None)).is_err());
    s.simulate(5).unwrap();
    assert!(s.event_log().is_empty());
    assert_eq!(s.registry().status().unwrap().task_count, 0);
}

#[test]
fn concurrent_adds_while_ticking() {
    let mut s = scheduler(Algorithm::Edf, &[]);
    let registry = s.registry().clone();
    let workers = 4;
    let per_worker = 20;
    let barrier = Arc::new(Barrier::new(workers + 1));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_worker)
                    .map(|_| {
                        let admission = registry.add_task(TaskSpec::new(None, 50, 1, None)).unwrap();
                        thread::yield_now();
                        admission
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    barrier.wait();
    for _ in 0..40 {
        s.step().unwrap();
    }
    let admissions: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    // Drain whatever was accepted after the last tick.
    s.step().unwrap();

    assert_eq!(admissions.len(), workers * per_worker);
    assert_eq!(registry.list_tasks().unwrap().len(), workers * per_worker);
    for admission in &admissions {
        let name = &admission.definition.name;
        assert_eq!(
            release_ticks(&s, name).first().copied(),
            Some(admission.release_tick),
            "{name} first release"
        );
    }
}

#[test]
fn shared_registry_clock_skew_is_an_invariant_violation() {
    let registry = TaskRegistry::new(Algorithm::Rm);
    let mut a = Scheduler::new(registry.clone());
    let mut b = Scheduler::new(registry);

    a.step().unwrap();
    b.step().unwrap();
    let err = a.step().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Invariant(InvariantViolation::NonMonotonicTick { previous: 0, got: 2 })
    ));
}

#[test]
fn status_tracks_active_instances() {
    let mut s = scheduler(Algorithm::Rm, &[("A", 4, 2, None), ("B", 4, 2, None)]);
    s.step().unwrap();
    let status = s.registry().status().unwrap();
    assert_eq!(status.current_tick, 1);
    assert_eq!(status.task_count, 2);
    assert_eq!(status.active_count, 2);
}

#[test]
fn report_summarizes_the_run() {
    let mut s = scheduler(Algorithm::Rm, &[("A", 4, 3, None), ("B", 6, 4, None)]);
    s.simulate(12).unwrap();

    let report = s.report();
    assert_eq!(report.ticks, 12);
    assert!((report.total_utilization - (0.75 + 4.0 / 6.0)).abs() < 1e-9);
    assert_eq!(report.misses.len(), s.deadline_misses().len());
    assert!(report.to_string().contains("Deadline misses"));
}

#[tokio::test(start_paused = true)]
async fn run_loop_paces_and_broadcasts() {
    let mut s = scheduler(Algorithm::Rm, &[("A", 2, 1, None)])
        .with_tick_interval(Duration::from_millis(1000));
    let mut rx = s.subscribe();
    let handle = s.handle();

    let task = tokio::spawn(async move {
        let result = s.run().await;
        (s, result)
    });

    for expected in 0..3 {
        let snap = rx.recv().await.unwrap();
        assert_eq!(snap.tick, expected);
    }

    handle.shutdown();
    let (s, result) = task.await.unwrap();
    result.unwrap();
    assert!(s.last_tick().unwrap() >= 2);
}

#[tokio::test]
async fn shutdown_before_run_returns_immediately() {
    let mut s = scheduler(Algorithm::Edf, &[("A", 2, 1, None)]);
    s.handle().shutdown();
    s.run().await.unwrap();
    assert_eq!(s.last_tick(), None);
}
