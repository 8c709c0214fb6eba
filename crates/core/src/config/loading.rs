use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::types::RtschedConfig;
use crate::error::ConfigError;

/// Default config file looked up when no path is given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "rtsched.toml";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl RtschedConfig {
    /// Parse config from a TOML string, then apply env overrides and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from an explicit path, or from `rtsched.toml` in the working
    /// directory when it exists, or fall back to defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    let mut config = Self::default();
                    config.apply_env_overrides();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// - `RTSCHED_SERVER_HOST` -> `server.host`
    /// - `RTSCHED_SERVER_PORT` -> `server.port`
    /// - `RTSCHED_ALGORITHM` -> `engine.algorithm`
    /// - `RTSCHED_TICK_INTERVAL_MS` -> `engine.tick_interval_ms`
    /// - `RTSCHED_TASKS_FILE` -> `tasks.file`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env_opt);
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are
    /// logged and ignored.
    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("RTSCHED_SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("RTSCHED_SERVER_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %v, "ignoring invalid RTSCHED_SERVER_PORT"),
            }
        }
        if let Some(v) = lookup("RTSCHED_ALGORITHM") {
            match v.parse() {
                Ok(algorithm) => self.engine.algorithm = algorithm,
                Err(e) => warn!(error = %e, "ignoring invalid RTSCHED_ALGORITHM"),
            }
        }
        if let Some(v) = lookup("RTSCHED_TICK_INTERVAL_MS") {
            match v.parse::<u64>() {
                Ok(ms) => self.engine.tick_interval_ms = ms,
                Err(_) => warn!(value = %v, "ignoring invalid RTSCHED_TICK_INTERVAL_MS"),
            }
        }
        if let Some(v) = lookup("RTSCHED_TASKS_FILE") {
            self.tasks.file = Some(PathBuf::from(v));
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        info!("Config loaded:");
        info!("  server:  {}", self.server.bind_addr());
        info!(
            "  engine:  algorithm={}, tick={}ms",
            self.engine.algorithm, self.engine.tick_interval_ms
        );
        info!(
            "  tasks:   file={}",
            self.tasks
                .file
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".into())
        );
    }
}
