//! Server configuration.
//!
//! Resolved in layers: built-in defaults, then an optional `rtsched.toml`,
//! then `RTSCHED_*` environment variables (a `.env` file is honoured), and
//! finally command-line flags applied by the binaries.

mod loading;
mod types;
mod validation;


pub use loading::load_dotenv;
pub use types::{EngineConfig, RtschedConfig, ServerConfig, TasksConfig};
