//! Duplex relay between a participant and the realtime service.

pub mod session;
pub mod upstream;

pub use session::{DuplexRelay, SessionEnd, SessionReport, ShutdownHandle, CONNECT_FAILED_MESSAGE};
pub use upstream::UpstreamSender;
