use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::task::Algorithm;

// ── Top-level config ────────────────────────────────────────────────

/// Full configuration for an `rtsched` server process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RtschedConfig {
    /// Session listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Tick loop settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Initial task set.
    #[serde(default)]
    pub tasks: TasksConfig,
}

// ── Section configs ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// 0 lets the OS pick a free port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8888
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Real time per simulated tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capacity of the snapshot broadcast channel.
    #[serde(default = "default_snapshot_buffer")]
    pub snapshot_buffer: usize,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_snapshot_buffer() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_buffer: default_snapshot_buffer(),
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TasksConfig {
    /// JSON file with the tasks admitted at tick 0.
    #[serde(default)]
    pub file: Option<PathBuf>,
}
