pub mod config;
pub mod error;
pub mod loader;
pub mod task;

pub use config::RtschedConfig;
pub use error::*;
pub use task::*;
