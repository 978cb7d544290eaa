//! Unique probe names

use crate::defaults::FIRST_PROBE_SEQUENCE;

/// Derives probe names from a prefix, a per-run nonce and a sequence number
///
/// Names look like `<prefix>/<nonce hex>/<payload size>/<seq>` with the
/// sequence zero-padded to six digits. The sequence keeps counting across
/// phases, so no two probes in a run share a name.
#[derive(Debug, Clone)]
pub struct ProbeNamer {
    prefix: String,
    nonce: u32,
    payload_size: usize,
    next_sequence: u64,
}

impl ProbeNamer {
    /// Namer with a random nonce
    pub fn new(prefix: &str, payload_size: usize) -> Self {
        let nonce = uuid::Uuid::new_v4().as_u128() as u32;
        Self::with_nonce(prefix, payload_size, nonce)
    }

    /// Namer with a fixed nonce, for reproducible names
    pub fn with_nonce(prefix: &str, payload_size: usize, nonce: u32) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            nonce,
            payload_size,
            next_sequence: FIRST_PROBE_SEQUENCE,
        }
    }

    /// Name for the next probe
    pub fn next_name(&mut self) -> String {
        let name = format!(
            "{}/{:x}/{}/{:06}",
            self.prefix, self.nonce, self.payload_size, self.next_sequence
        );
        self.next_sequence += 1;
        name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// Sequence number the next name will carry
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}
