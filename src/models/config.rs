//! Configuration data model and validation

use crate::types::{AppError, Result, RunMode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pacing mode; a run cannot start without one
    #[serde(default)]
    pub mode: Option<RunMode>,

    /// Number of probes per phase
    #[serde(default = "default_probe_count")]
    pub probe_count: u64,

    /// Interval between probes in ping mode, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Payload size hint embedded in every probe name
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    /// Maximum in-flight unmatched probes (0 = unbounded)
    #[serde(default = "default_outstanding")]
    pub outstanding: usize,

    /// Name prefix the probe session is bound to
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Idle receive timeout used while draining stragglers, in microseconds
    #[serde(default = "default_receive_timeout_us")]
    pub receive_timeout_us: u64,

    /// Address of the echo server
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Local address the client socket binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: None,
            probe_count: default_probe_count(),
            interval_ms: default_interval_ms(),
            payload_size: default_payload_size(),
            outstanding: default_outstanding(),
            prefix: default_prefix(),
            receive_timeout_us: default_receive_timeout_us(),
            server_addr: default_server_addr(),
            bind_addr: default_bind_addr(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Pacing interval in microseconds
    pub fn interval_us(&self) -> u64 {
        self.interval_ms.saturating_mul(1000)
    }

    /// Idle receive timeout as Duration
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_micros(self.receive_timeout_us)
    }

    /// Parsed server address
    pub fn server_socket_addr(&self) -> Result<SocketAddr> {
        self.server_addr
            .parse()
            .map_err(|e| AppError::config(format!("Invalid server address '{}': {}", self.server_addr, e)))
    }

    /// Parsed local bind address
    pub fn bind_socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| AppError::config(format!("Invalid bind address '{}': {}", self.bind_addr, e)))
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.mode.is_none() {
            return Err(AppError::config("No run mode selected: use --ping, --flood or --all"));
        }

        if self.probe_count == 0 {
            return Err(AppError::config("Probe count must be greater than 0"));
        }

        if self.payload_size > crate::defaults::MAX_PAYLOAD_SIZE {
            return Err(AppError::config(format!(
                "Payload size {} exceeds the maximum of {} bytes",
                self.payload_size,
                crate::defaults::MAX_PAYLOAD_SIZE
            )));
        }

        if self.receive_timeout_us == 0 {
            return Err(AppError::config("Receive timeout must be greater than 0"));
        }

        validate_prefix(&self.prefix)?;
        self.server_socket_addr()?;
        self.bind_socket_addr()?;

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(mode) = std::env::var("PROBE_MODE") {
            self.mode = Some(mode.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_MODE value '{}': {}", mode, e)))?);
        }

        if let Ok(count) = std::env::var("PROBE_COUNT") {
            self.probe_count = count.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(interval) = std::env::var("PROBE_INTERVAL_MS") {
            self.interval_ms = interval.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_INTERVAL_MS value '{}': {}", interval, e)))?;
        }

        if let Ok(size) = std::env::var("PROBE_PAYLOAD_SIZE") {
            self.payload_size = size.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_PAYLOAD_SIZE value '{}': {}", size, e)))?;
        }

        if let Ok(outstanding) = std::env::var("PROBE_OUTSTANDING") {
            self.outstanding = outstanding.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_OUTSTANDING value '{}': {}", outstanding, e)))?;
        }

        if let Ok(prefix) = std::env::var("PROBE_PREFIX") {
            self.prefix = prefix.trim().to_string();
        }

        if let Ok(timeout) = std::env::var("PROBE_RECEIVE_TIMEOUT_US") {
            self.receive_timeout_us = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_RECEIVE_TIMEOUT_US value '{}': {}", timeout, e)))?;
        }

        if let Ok(addr) = std::env::var("PROBE_SERVER_ADDR") {
            self.server_addr = addr.trim().to_string();
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Check that a name prefix is an absolute `scheme:/path` name
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(AppError::validation("Name prefix cannot be empty"));
    }

    let parsed = url::Url::parse(prefix)
        .map_err(|e| AppError::validation(format!("Invalid name prefix '{}': {}", prefix, e)))?;

    if !parsed.path().starts_with('/') {
        return Err(AppError::validation(format!("Name prefix must have an absolute path: {}", prefix)));
    }

    Ok(())
}

// Default value functions for serde
fn default_probe_count() -> u64 {
    crate::defaults::DEFAULT_PROBE_COUNT
}

fn default_interval_ms() -> u64 {
    crate::defaults::DEFAULT_INTERVAL_MS
}

fn default_payload_size() -> usize {
    crate::defaults::DEFAULT_PAYLOAD_SIZE
}

fn default_outstanding() -> usize {
    crate::defaults::DEFAULT_OUTSTANDING
}

fn default_prefix() -> String {
    crate::defaults::DEFAULT_PREFIX.to_string()
}

fn default_receive_timeout_us() -> u64 {
    crate::defaults::DEFAULT_RECEIVE_TIMEOUT_US
}

fn default_server_addr() -> String {
    crate::defaults::DEFAULT_SERVER_ADDR.to_string()
}

fn default_bind_addr() -> String {
    crate::defaults::DEFAULT_BIND_ADDR.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
