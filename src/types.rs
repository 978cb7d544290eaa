//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// How the client paces its probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Send as fast as the outstanding window allows
    Flood,
    /// Send one probe per interval and trace every response
    Ping,
    /// A flood phase followed by a paced phase, each reported separately
    All,
}

impl RunMode {
    /// Get a human-readable name for this mode
    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Flood => "flood",
            RunMode::Ping => "ping",
            RunMode::All => "all",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "flood" | "f" => Ok(RunMode::Flood),
            "ping" | "p" | "pingpong" => Ok(RunMode::Ping),
            "all" | "a" | "mixed" => Ok(RunMode::All),
            other => Err(AppError::parse(format!("Unknown run mode: {}", other))),
        }
    }
}

/// Lifecycle of one phase inside the pacing scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhaseState {
    /// Issuing probes, interleaved with draining responses
    #[default]
    Sending,
    /// All probes issued, collecting stragglers
    Draining,
    /// Terminal; the phase snapshot is final
    Done,
}

/// Lifecycle of one probe inside the correlation store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeStatus {
    /// Sent and not yet matched; counts against the outstanding window
    InFlight,
    /// Matched exactly once
    Completed,
}
