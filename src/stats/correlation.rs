//! Request/response correlation keyed by probe name

use crate::models::ProbeRecord;
use std::collections::hash_map::{Entry, HashMap};
use thiserror::Error;

/// Outcomes of a correlation lookup that did not produce an RTT
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// The key was already recorded in this phase
    #[error("probe key already recorded: {0}")]
    DuplicateKey(String),

    /// Unknown key, or a response for a probe that was already matched
    #[error("no unmatched probe for key: {0}")]
    NotFound(String),
}

/// Map from probe name to its record for one phase
///
/// Records are never removed while the phase runs. The store keeps an exact
/// count of in-flight probes so the scheduler can enforce its window without
/// scanning.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    records: HashMap<String, ProbeRecord>,
    in_flight: usize,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new in-flight record for `key`
    pub fn record(&mut self, key: String, send_timestamp_us: u64) -> Result<&ProbeRecord, CorrelationError> {
        match self.records.entry(key) {
            Entry::Occupied(entry) => Err(CorrelationError::DuplicateKey(entry.key().clone())),
            Entry::Vacant(entry) => {
                let record = ProbeRecord::new(entry.key().clone(), send_timestamp_us);
                self.in_flight += 1;
                Ok(entry.insert(record))
            }
        }
    }

    /// Match a response to its probe and return the RTT
    ///
    /// A key that is unknown or already completed yields `NotFound` and leaves
    /// the store untouched.
    pub fn match_and_complete(
        &mut self,
        key: &str,
        receive_timestamp_us: u64,
        payload_size_bytes: usize,
    ) -> Result<u64, CorrelationError> {
        let record = match self.records.get_mut(key) {
            Some(record) if !record.is_completed() => record,
            _ => return Err(CorrelationError::NotFound(key.to_string())),
        };

        self.in_flight -= 1;
        Ok(record.complete(receive_timestamp_us, payload_size_bytes))
    }

    pub fn get(&self, key: &str) -> Option<&ProbeRecord> {
        self.records.get(key)
    }

    /// Probes sent and not yet matched
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_match() {
        let mut store = CorrelationStore::new();
        store.record("p/100".to_string(), 1_000).unwrap();
        assert_eq!(store.in_flight(), 1);

        let rtt = store.match_and_complete("p/100", 1_420, 64).unwrap();
        assert_eq!(rtt, 420);
        assert_eq!(store.in_flight(), 0);

        let record = store.get("p/100").unwrap();
        assert_eq!(record.payload_size_bytes, Some(64));
        assert!(record.is_completed());
    }

    #[test]
    fn test_duplicate_record_rejected() {
        let mut store = CorrelationStore::new();
        store.record("p/100".to_string(), 1).unwrap();

        let err = store.record("p/100".to_string(), 2).unwrap_err();
        assert_eq!(err, CorrelationError::DuplicateKey("p/100".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("p/100").unwrap().send_timestamp_us, 1);
    }

    #[test]
    fn test_second_match_is_not_found() {
        let mut store = CorrelationStore::new();
        store.record("p/100".to_string(), 10).unwrap();
        store.match_and_complete("p/100", 20, 1).unwrap();

        let err = store.match_and_complete("p/100", 90, 1).unwrap_err();
        assert!(matches!(err, CorrelationError::NotFound(_)));
        assert_eq!(store.get("p/100").unwrap().rtt_us, Some(10));
        assert_eq!(store.in_flight(), 0);
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let mut store = CorrelationStore::new();
        assert!(store.match_and_complete("nope", 5, 0).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_out_of_order_matches_keep_exact_count() {
        let mut store = CorrelationStore::new();
        store.record("a".to_string(), 100).unwrap();
        store.record("b".to_string(), 200).unwrap();
        store.record("c".to_string(), 300).unwrap();

        assert_eq!(store.match_and_complete("c", 400, 8).unwrap(), 100);
        assert_eq!(store.in_flight(), 2);
        assert_eq!(store.match_and_complete("a", 1_100, 8).unwrap(), 1_000);
        assert_eq!(store.in_flight(), 1);
        assert!(store.get("b").unwrap().is_in_flight());
    }
}
