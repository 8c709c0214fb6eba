use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::snapshot::TickSnapshot;

use super::{EngineError, Scheduler};

impl Scheduler {
    /// Run the real-time tick loop until [`SchedulerHandle::shutdown`] is
    /// called. One tick per configured interval; never waits on clients.
    ///
    /// Snapshots are broadcast to subscribers; a slow subscriber lags
    /// instead of slowing the loop. An invariant violation ends the loop
    /// with an error.
    ///
    /// [`SchedulerHandle::shutdown`]: super::SchedulerHandle::shutdown
    pub async fn run(&mut self) -> Result<(), EngineError> {
        info!(
            algorithm = %self.algorithm(),
            interval = ?self.tick_interval,
            tasks = self.trackers.len(),
            "tick loop starting"
        );

        let shutdown = Arc::clone(&self.shutdown);
        let stopped = shutdown.notified();
        tokio::pin!(stopped);

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => break,
                _ = ticker.tick() => {
                    let snapshot = match self.step() {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            error!(error = %e, "tick loop aborted");
                            return Err(e);
                        }
                    };
                    // No subscribers is not an error.
                    let _ = self.snapshots.send(Arc::new(snapshot));
                }
            }
        }

        info!(ticks = self.metrics.total_ticks(), "tick loop stopped");
        Ok(())
    }

    /// Run `ticks` ticks back to back without pacing.
    pub fn simulate(&mut self, ticks: u64) -> Result<Vec<TickSnapshot>, EngineError> {
        (0..ticks).map(|_| self.step()).collect()
    }
}
