pub mod artifact;
pub mod cli;
pub mod client;
pub mod config;
pub mod credentials;
pub mod export;
pub mod queue;
pub mod sink;
pub mod window;

pub use artifact::Artifact;
pub use client::{LogRecord, RemoteJobClient, SessionState};
pub use export::{ExportCoordinator, ExportRange, ExportSummary};
pub use window::{partition, TimeWindow};
