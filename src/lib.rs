//! RTT Probe
//!
//! A round-trip latency and throughput prober: the client issues uniquely
//! named probe requests over a datagram transport, an echo server answers
//! each with a payload, and the client correlates every response with the
//! request that caused it to compute per-probe and aggregate RTT.

pub mod app;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod server;
pub mod stats;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, ProbeRecord, RunSnapshot};
pub use stats::{CorrelationStore, StatsAggregator};
pub use executor::{PacingScheduler, PhasePlan, PhaseReport};
pub use transport::{TransportChannel, UdpTransport};
pub use output::{ReportFormatter, ColoredFormatter, PlainFormatter, OutputFormatterFactory};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const BUILD_TIME: &str = env!("BUILD_TIME");

/// Default configuration values
pub mod defaults {
    pub const DEFAULT_PROBE_COUNT: u64 = 10;
    pub const DEFAULT_INTERVAL_MS: u64 = 1000;
    pub const DEFAULT_PAYLOAD_SIZE: usize = 4096;
    /// Largest payload a single datagram response can carry
    pub const MAX_PAYLOAD_SIZE: usize = 64_000;
    /// 0 leaves the number of in-flight probes unbounded
    pub const DEFAULT_OUTSTANDING: usize = 0;
    pub const DEFAULT_RECEIVE_TIMEOUT_US: u64 = 1_000_000;
    pub const DEFAULT_PREFIX: &str = "lci:/localhost/ping";
    pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:9695";
    pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:0";
    pub const DEFAULT_SERVER_BIND_ADDR: &str = "0.0.0.0:9695";
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Probe count of the flood phase in `--all` mode
    pub const MEDIUM_NUMBER_OF_PINGS: u64 = 100;
    /// Probe count of the paced phase in `--all` mode
    pub const SMALL_NUMBER_OF_PINGS: u64 = 10;

    /// First sequence number embedded in probe names
    pub const FIRST_PROBE_SEQUENCE: u64 = 100;
}
