use super::types::RtschedConfig;
use crate::error::ConfigError;

impl RtschedConfig {
    /// Validate values that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        if self.engine.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.tick_interval_ms must be greater than 0".into(),
            ));
        }
        if self.engine.snapshot_buffer == 0 {
            return Err(ConfigError::Invalid(
                "engine.snapshot_buffer must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
