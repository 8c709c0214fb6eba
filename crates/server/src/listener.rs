use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::watch;
use tracing::{info, warn};

use rtsched_engine::TaskRegistry;

use crate::session;

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause after `failures` consecutive accept errors (e.g. EMFILE).
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1u32 << failures.saturating_sub(1).min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

/// Accepts client connections and serves each one on its own task.
pub struct SessionListener {
    listener: TcpListener,
    registry: TaskRegistry,
}

impl SessionListener {
    pub async fn bind(addr: impl ToSocketAddrs, registry: TaskRegistry) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until `shutdown` turns `true` or its sender is dropped.
    /// Sessions already running are left to finish on their own.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(addr = ?self.listener.local_addr().ok(), "listening for clients");

        let mut failures = 0u32;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        failures = 0;
                        let registry = self.registry.clone();
                        tokio::spawn(async move {
                            info!(peer = %peer, "session opened");
                            match session::serve(stream, registry).await {
                                Ok(()) => info!(peer = %peer, "session closed"),
                                Err(e) => warn!(peer = %peer, error = %e, "session ended with error"),
                            }
                        });
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        let pause = accept_backoff(failures);
                        warn!(error = %e, backoff_ms = pause.as_millis() as u64, "accept failed");
                        tokio::time::sleep(pause).await;
                    }
                },
            }
        }

        info!("listener stopped");
    }
}
