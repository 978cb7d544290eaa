//! Scheduler scenarios on a scripted transport and a manual clock
//!
//! Every receive advances the shared clock either to the delivery time of
//! the next queued response or to the end of the requested timeout, so the
//! runs are fully deterministic.

use async_trait::async_trait;
use rtt_probe::{
    codec::{Message, ProbeNamer, WireCodec},
    executor::{Clock, ManualClock, MatchObserver, NoTrace, PacingScheduler, PhasePlan, SchedulerSettings},
    transport::{TransportChannel, TransportFault},
};
use std::collections::VecDeque;
use std::time::Duration;

const IDLE_US: u64 = 1_000;

/// Echo peer with a fixed delay and scripted failures
struct ScriptedPeer {
    clock: ManualClock,
    delay_us: u64,
    pending: VecDeque<(u64, Message)>,
    attempts: u64,
    /// 1-based send attempts that fail
    failing_sends: Vec<u64>,
    /// Failures are persistent instead of transient
    persistent: bool,
    /// Answer nothing
    black_hole: bool,
    /// Deliver every response twice
    duplicate: bool,
    last_error: Option<TransportFault>,
    outstanding: usize,
    max_outstanding: usize,
}

impl ScriptedPeer {
    fn new(clock: ManualClock, delay_us: u64) -> Self {
        Self {
            clock,
            delay_us,
            pending: VecDeque::new(),
            attempts: 0,
            failing_sends: Vec::new(),
            persistent: false,
            black_hole: false,
            duplicate: false,
            last_error: None,
            outstanding: 0,
            max_outstanding: 0,
        }
    }

    fn queue(&mut self, at: u64, name: String) {
        self.pending.push_back((at, Message::Response { name, payload: vec![0; 64] }));
    }
}

#[async_trait]
impl TransportChannel for ScriptedPeer {
    async fn send(&mut self, message: Message) -> bool {
        self.attempts += 1;
        if self.failing_sends.contains(&self.attempts) {
            self.last_error = Some(if self.persistent {
                TransportFault::persistent(32, "broken pipe")
            } else {
                TransportFault::transient(105, "no buffer space")
            });
            return false;
        }

        if let Message::Request { name } = message {
            self.outstanding += 1;
            self.max_outstanding = self.max_outstanding.max(self.outstanding);
            if !self.black_hole {
                let at = self.clock.now_us() + self.delay_us;
                if self.duplicate {
                    self.queue(at, name.clone());
                }
                self.queue(at, name);
            }
        }
        true
    }

    async fn receive(&mut self, timeout: Duration) -> Option<Message> {
        let limit = self.clock.now_us() + timeout.as_micros() as u64;
        match self.pending.front() {
            Some((at, _)) if *at <= limit => {
                self.clock.advance_to(*at);
                let (_, message) = self.pending.pop_front()?;
                self.outstanding = self.outstanding.saturating_sub(1);
                Some(message)
            }
            _ => {
                self.clock.advance_to(limit);
                None
            }
        }
    }

    fn last_error(&self) -> Option<TransportFault> {
        self.last_error.clone()
    }

    fn prefix(&self) -> &str {
        "lci:/scenario"
    }

    async fn close(&mut self) {}
}

#[derive(Default)]
struct Trace(Vec<(String, u64)>);

impl MatchObserver for Trace {
    fn on_match(&mut self, name: &str, _payload_size: usize, rtt_us: u64) {
        self.0.push((name.to_string(), rtt_us));
    }
}

fn scheduler_with(
    peer: impl FnOnce(ManualClock) -> ScriptedPeer,
    window: usize,
) -> PacingScheduler<ScriptedPeer, WireCodec, ManualClock> {
    let clock = ManualClock::new(5_000_000);
    PacingScheduler::new(
        peer(clock.clone()),
        WireCodec::new(),
        clock,
        ProbeNamer::with_nonce("lci:/scenario", 64, 0x5eed),
        SchedulerSettings { window, receive_idle_timeout_us: IDLE_US },
    )
}

#[tokio::test]
async fn flood_with_constant_delay_reports_exact_mean() {
    let mut scheduler = scheduler_with(|clock| ScriptedPeer::new(clock, 50), 0);

    let report = scheduler.run_phase(&PhasePlan::flood(10), &mut NoTrace).await;

    assert!(report.is_complete());
    assert_eq!(report.snapshot.sent_count, 10);
    assert_eq!(report.snapshot.received_count, 10);
    assert_eq!(report.snapshot.mean_rtt_us, Some(50));
    assert_eq!(report.stale_responses, 0);
    assert_eq!(report.unsent_probes, 0);
}

#[tokio::test]
async fn outstanding_window_is_never_exceeded() {
    let mut scheduler = scheduler_with(|clock| ScriptedPeer::new(clock, 100), 3);

    let report = scheduler.run_phase(&PhasePlan::flood(20), &mut NoTrace).await;

    assert_eq!(report.snapshot.sent_count, 20);
    assert_eq!(report.snapshot.received_count, 20);
    assert_eq!(report.snapshot.mean_rtt_us, Some(100));
    assert!(scheduler.transport().max_outstanding <= 3);
    assert_eq!(scheduler.transport().max_outstanding, 3);
}

#[tokio::test]
async fn transient_send_failure_skips_one_probe() {
    let mut scheduler = scheduler_with(
        |clock| {
            let mut peer = ScriptedPeer::new(clock, 80);
            peer.failing_sends = vec![3];
            peer
        },
        0,
    );
    let mut trace = Trace::default();

    let report = scheduler.run_phase(&PhasePlan::paced(5, 500).with_trace(true), &mut trace).await;

    assert!(report.is_complete());
    assert_eq!(report.snapshot.sent_count, 4);
    assert_eq!(report.snapshot.received_count, 4);
    assert_eq!(report.snapshot.mean_rtt_us, Some(80));

    // The failed attempt still consumed its name
    let names: Vec<&str> = trace.0.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "lci:/scenario/5eed/64/000100",
            "lci:/scenario/5eed/64/000101",
            "lci:/scenario/5eed/64/000103",
            "lci:/scenario/5eed/64/000104",
        ]
    );
}

#[tokio::test]
async fn persistent_fault_ends_phase_with_partial_statistics() {
    let mut scheduler = scheduler_with(
        |clock| {
            let mut peer = ScriptedPeer::new(clock, 10);
            peer.failing_sends = vec![3];
            peer.persistent = true;
            peer
        },
        0,
    );

    let report = scheduler.run_phase(&PhasePlan::paced(6, 100), &mut NoTrace).await;

    assert!(!report.is_complete());
    assert!(report.fault.as_ref().unwrap().is_persistent());
    assert_eq!(report.snapshot.sent_count, 2);
    assert_eq!(report.snapshot.received_count, 2);
    assert_eq!(report.error().unwrap().category(), "TRANSPORT");
    assert_eq!(scheduler.transport().attempts, 3);
}

#[tokio::test]
async fn total_loss_with_full_window_still_terminates() {
    let mut scheduler = scheduler_with(
        |clock| {
            let mut peer = ScriptedPeer::new(clock, 10);
            peer.black_hole = true;
            peer
        },
        2,
    );

    let report = scheduler.run_phase(&PhasePlan::flood(6), &mut NoTrace).await;

    assert!(report.is_complete());
    assert_eq!(report.snapshot.sent_count, 2);
    assert_eq!(report.snapshot.received_count, 0);
    assert_eq!(report.snapshot.mean_rtt_us, None);
    assert_eq!(report.unsent_probes, 4);
    assert_eq!(scheduler.transport().attempts, 2);
}

#[tokio::test]
async fn responses_slower_than_idle_timeout_never_exceed_window() {
    let mut scheduler = scheduler_with(|clock| ScriptedPeer::new(clock, 1_500), 2);

    let report = scheduler.run_phase(&PhasePlan::flood(10), &mut NoTrace).await;

    assert!(report.is_complete());
    assert!(scheduler.transport().max_outstanding <= 2);
    assert_eq!(report.snapshot.sent_count, 2);
    assert_eq!(report.snapshot.received_count, 2);
    assert_eq!(report.snapshot.mean_rtt_us, Some(1_500));
    assert_eq!(report.unsent_probes, 8);
}

#[tokio::test]
async fn each_match_restarts_the_stall_timer() {
    // The window stays full for the whole run, well past one idle timeout in total
    let mut scheduler = scheduler_with(|clock| ScriptedPeer::new(clock, 700), 1);

    let report = scheduler.run_phase(&PhasePlan::flood(5), &mut NoTrace).await;

    assert_eq!(report.snapshot.sent_count, 5);
    assert_eq!(report.snapshot.received_count, 5);
    assert_eq!(report.snapshot.mean_rtt_us, Some(700));
    assert_eq!(report.unsent_probes, 0);
    assert_eq!(scheduler.transport().max_outstanding, 1);
}

#[tokio::test]
async fn duplicate_responses_are_counted_once() {
    let mut scheduler = scheduler_with(
        |clock| {
            let mut peer = ScriptedPeer::new(clock, 300);
            peer.duplicate = true;
            peer
        },
        0,
    );
    let mut trace = Trace::default();

    let report = scheduler.run_phase(&PhasePlan::paced(3, 1_000).with_trace(true), &mut trace).await;

    assert_eq!(report.snapshot.sent_count, 3);
    assert_eq!(report.snapshot.received_count, 3);
    assert_eq!(trace.0.len(), 3);
    // The last copy is still queued when draining sees nothing in flight
    assert_eq!(report.stale_responses, 2);
}

#[tokio::test]
async fn each_phase_starts_from_fresh_statistics() {
    let mut scheduler = scheduler_with(|clock| ScriptedPeer::new(clock, 40), 0);

    let flood = scheduler.run_phase(&PhasePlan::flood(100), &mut NoTrace).await;
    let paced = scheduler.run_phase(&PhasePlan::paced(10, IDLE_US), &mut NoTrace).await;

    assert_eq!((flood.snapshot.sent_count, flood.snapshot.received_count), (100, 100));
    assert_eq!((paced.snapshot.sent_count, paced.snapshot.received_count), (10, 10));
    assert_eq!(paced.label, "ping");
    assert_eq!(flood.label, "flood");
}
