//! Text Gantt chart built from tick snapshots.
//!
//! One column per tick, one row per task. Rows of tasks admitted mid-run
//! are blank before their first tick.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::snapshot::{CellSymbol, EngineEvent, TickSnapshot};

#[derive(Debug, Default, Clone)]
pub struct GanttChart {
    first_tick: Option<u64>,
    columns: usize,
    rows: IndexMap<String, Vec<Option<CellSymbol>>>,
    events: Vec<EngineEvent>,
}

impl GanttChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one tick. Snapshots must arrive in tick order.
    pub fn push(&mut self, snapshot: &TickSnapshot) {
        self.first_tick.get_or_insert(snapshot.tick);
        let column = self.columns;
        for state in &snapshot.tasks {
            let row = self.rows.entry(state.task.clone()).or_default();
            row.resize(column, None);
            row.push(Some(state.symbol()));
        }
        self.columns += 1;
        self.events.extend(snapshot.events.iter().cloned());
    }

    pub fn extend<'a>(&mut self, snapshots: impl IntoIterator<Item = &'a TickSnapshot>) {
        for snapshot in snapshots {
            self.push(snapshot);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some(first) = self.first_tick else {
            return out;
        };
        let label = self.rows.keys().map(String::len).max().unwrap_or(0).max(4);

        // Tick header: last digit per column, a full number every ten ticks.
        let mut marks = String::new();
        let mut digits = String::new();
        let mut col = 0;
        while col < self.columns {
            let tick = first + col as u64;
            if tick % 10 == 0 {
                let number = tick.to_string();
                if number.len() <= self.columns - col {
                    marks.push_str(&number);
                    col += number.len();
                    continue;
                }
            }
            marks.push(' ');
            col += 1;
        }
        for col in 0..self.columns {
            let tick = first + col as u64;
            digits.push(char::from(b'0' + (tick % 10) as u8));
        }
        let _ = writeln!(out, "{:<label$} |{}", "", marks.trim_end());
        let _ = writeln!(out, "{:<label$} |{}", "tick", digits);

        for (task, cells) in &self.rows {
            let line: String = (0..self.columns)
                .map(|i| cells.get(i).copied().flatten().map_or(' ', CellSymbol::as_char))
                .collect();
            let _ = writeln!(out, "{task:<label$} |{line}");
        }

        let _ = writeln!(
            out,
            "legend: {} executing  {} ready  {} idle  {} release  {} deadline miss",
            CellSymbol::Executing.as_char(),
            CellSymbol::Ready.as_char(),
            CellSymbol::Idle.as_char(),
            CellSymbol::Release.as_char(),
            CellSymbol::Deadline.as_char(),
        );
        out
    }

    /// Chronological event log, one line per event, prefixed with the
    /// wall-clock (UTC) time the engine recorded it.
    pub fn render_events(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            let _ = writeln!(out, "{} {event}", event.recorded_at.format("%H:%M:%S%.3f"));
        }
        out
    }
}
