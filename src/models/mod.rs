//! Data models and structures for the RTT prober

pub mod config;
pub mod probe;

// Re-export main model types
pub use config::Config;
pub use probe::{ProbeRecord, RunSnapshot};
