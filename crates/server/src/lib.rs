pub mod listener;
pub mod protocol;
pub mod session;

pub use listener::SessionListener;
pub use protocol::{Command, ProtocolError, MAX_LINE_BYTES};
