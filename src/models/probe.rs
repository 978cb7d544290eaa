//! Probe records and run statistics snapshots

use crate::types::ProbeStatus;
use serde::{Deserialize, Serialize};

/// One issued probe request and, once matched, its response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    /// Probe name; the correlation key
    pub key: String,

    /// Wall-clock send time in microseconds
    pub send_timestamp_us: u64,

    /// Wall-clock receive time in microseconds, set once matched
    pub receive_timestamp_us: Option<u64>,

    /// Round-trip time, computed once at match time
    pub rtt_us: Option<u64>,

    /// Payload size of the matched response
    pub payload_size_bytes: Option<usize>,

    /// Where the probe is in its lifecycle
    pub status: ProbeStatus,
}

impl ProbeRecord {
    /// Create a new in-flight record
    pub fn new(key: String, send_timestamp_us: u64) -> Self {
        Self {
            key,
            send_timestamp_us,
            receive_timestamp_us: None,
            rtt_us: None,
            payload_size_bytes: None,
            status: ProbeStatus::InFlight,
        }
    }

    /// Check whether a response has been matched to this probe
    pub fn is_completed(&self) -> bool {
        self.status == ProbeStatus::Completed
    }

    /// Check whether this probe still occupies a slot in the outstanding window
    pub fn is_in_flight(&self) -> bool {
        self.status == ProbeStatus::InFlight
    }

    /// Stamp the response; returns the RTT
    pub(crate) fn complete(&mut self, receive_timestamp_us: u64, payload_size_bytes: usize) -> u64 {
        // Wall clock may step backwards between send and receive
        let rtt_us = receive_timestamp_us.saturating_sub(self.send_timestamp_us);
        self.receive_timestamp_us = Some(receive_timestamp_us);
        self.rtt_us = Some(rtt_us);
        self.payload_size_bytes = Some(payload_size_bytes);
        self.status = ProbeStatus::Completed;
        rtt_us
    }
}

/// Read-only view of one phase's aggregate counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub sent_count: u64,
    pub received_count: u64,
    /// Absent when nothing was received
    pub mean_rtt_us: Option<u64>,
}

impl RunSnapshot {
    /// Probes sent but never matched
    pub fn unanswered(&self) -> u64 {
        self.sent_count.saturating_sub(self.received_count)
    }

    /// Fraction of sent probes that were answered, as a percentage
    pub fn response_rate(&self) -> f64 {
        if self.sent_count == 0 {
            0.0
        } else {
            (self.received_count as f64 / self.sent_count as f64) * 100.0
        }
    }
}
