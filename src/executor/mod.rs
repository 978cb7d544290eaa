//! Probe pacing engine
//!
//! The [`PacingScheduler`] drives one phase at a time through the
//! Sending -> Draining -> Done state machine:
//! - sends are bounded by the probe count, the outstanding window and the
//!   pacing interval
//! - every receive gets a freshly computed timeout
//! - a window that stays full for a whole idle timeout stops further sends
//! - each matched response updates a per-phase store and aggregator

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::{
    codec::{Message, MessageCodec, ProbeNamer},
    defaults,
    error::{AppError, Result},
    logging::ProbeLogger,
    models::{Config, RunSnapshot},
    stats::{CorrelationStore, StatsAggregator},
    transport::{TransportChannel, TransportFault},
    types::{PhaseState, RunMode},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One phase of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    /// Name shown in report headers
    pub label: String,
    /// Send attempts in this phase
    pub probe_count: u64,
    /// Spacing between sends; 0 floods
    pub interval_us: u64,
    /// Emit a trace line per matched response
    pub trace: bool,
}

impl PhasePlan {
    /// Send as fast as the window allows
    pub fn flood(probe_count: u64) -> Self {
        Self {
            label: "flood".to_string(),
            probe_count,
            interval_us: 0,
            trace: false,
        }
    }

    /// Send one probe every `interval_us`
    pub fn paced(probe_count: u64, interval_us: u64) -> Self {
        Self {
            label: "ping".to_string(),
            probe_count,
            interval_us,
            trace: false,
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn is_flood(&self) -> bool {
        self.interval_us == 0
    }

    /// Phases for the configured run mode
    pub fn for_config(config: &Config) -> Result<Vec<PhasePlan>> {
        let mode = config
            .mode
            .ok_or_else(|| AppError::config("No run mode selected: use --ping, --flood or --all"))?;

        Ok(match mode {
            RunMode::Flood => vec![Self::flood(config.probe_count)],
            RunMode::Ping => vec![Self::paced(config.probe_count, config.interval_us()).with_trace(true)],
            RunMode::All => vec![
                Self::flood(defaults::MEDIUM_NUMBER_OF_PINGS),
                Self::paced(defaults::SMALL_NUMBER_OF_PINGS, config.receive_timeout_us),
            ],
        })
    }
}

/// Limits that apply to every phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Maximum unmatched in-flight probes; 0 is unbounded
    pub window: usize,
    /// How long draining waits for the next response
    pub receive_idle_timeout_us: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            window: defaults::DEFAULT_OUTSTANDING,
            receive_idle_timeout_us: defaults::DEFAULT_RECEIVE_TIMEOUT_US,
        }
    }
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            window: config.outstanding,
            receive_idle_timeout_us: config.receive_timeout_us,
        }
    }
}

/// Outcome of one phase
///
/// A phase cut short by a persistent transport fault still carries the
/// statistics gathered up to that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub label: String,
    pub snapshot: RunSnapshot,
    /// Responses that matched no unmatched probe
    pub stale_responses: u64,
    /// Probes never sent because the window stayed full for a whole idle timeout
    pub unsent_probes: u64,
    pub fault: Option<TransportFault>,
}

impl PhaseReport {
    pub fn is_complete(&self) -> bool {
        self.fault.is_none()
    }

    /// The fault as an application error, if the phase ended early
    pub fn error(&self) -> Option<AppError> {
        self.fault.clone().map(AppError::from)
    }
}

/// Receives every matched response of a traced phase
pub trait MatchObserver: Send {
    fn on_match(&mut self, name: &str, payload_size: usize, rtt_us: u64);
}

/// Observer that discards matches
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl MatchObserver for NoTrace {
    fn on_match(&mut self, _name: &str, _payload_size: usize, _rtt_us: u64) {}
}

/// Per-phase state; replaced wholesale between phases
#[derive(Debug, Default)]
struct PhaseRun {
    store: CorrelationStore,
    stats: StatsAggregator,
    state: PhaseState,
    issued: u64,
    next_deadline_us: u64,
    stall_deadline_us: Option<u64>,
    drain_deadline_us: u64,
    stale_responses: u64,
    unsent_probes: u64,
    fault: Option<TransportFault>,
}

/// Drives phases over a transport
pub struct PacingScheduler<T, C, K> {
    transport: T,
    codec: C,
    clock: K,
    namer: ProbeNamer,
    settings: SchedulerSettings,
    logger: ProbeLogger,
}

impl<T, C, K> PacingScheduler<T, C, K>
where
    T: TransportChannel,
    C: MessageCodec,
    K: Clock,
{
    pub fn new(transport: T, codec: C, clock: K, namer: ProbeNamer, settings: SchedulerSettings) -> Self {
        Self {
            transport,
            codec,
            clock,
            namer,
            settings,
            logger: ProbeLogger::new(&Config::default()),
        }
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run one phase to completion with fresh correlation and statistics state
    pub async fn run_phase(&mut self, plan: &PhasePlan, observer: &mut dyn MatchObserver) -> PhaseReport {
        let idle_us = self.settings.receive_idle_timeout_us;
        let mut run = PhaseRun {
            next_deadline_us: self.clock.now_us(),
            ..PhaseRun::default()
        };

        let correlation_id = self
            .logger
            .phase_started(&plan.label, plan.probe_count, plan.interval_us, self.settings.window)
            .await;

        while run.fault.is_none() {
            match run.state {
                PhaseState::Sending => {
                    if run.issued >= plan.probe_count {
                        run.state = PhaseState::Draining;
                        run.drain_deadline_us = self.clock.now_us().saturating_add(idle_us);
                        continue;
                    }

                    let now = self.clock.now_us();
                    let pace_ready = plan.is_flood() || now >= run.next_deadline_us;
                    if !self.window_full(&run) && pace_ready {
                        self.issue_probe(&mut run, plan).await;
                        if run.fault.is_some() {
                            break;
                        }
                    }

                    let window_full = self.window_full(&run);
                    let now = self.clock.now_us();
                    let timeout_us = if window_full {
                        let stall_deadline = *run.stall_deadline_us.get_or_insert(now.saturating_add(idle_us));
                        stall_deadline.saturating_sub(now)
                    } else {
                        run.stall_deadline_us = None;
                        if plan.is_flood() || run.issued >= plan.probe_count {
                            0
                        } else {
                            run.next_deadline_us.saturating_sub(now)
                        }
                    };

                    let message = self.transport.receive(Duration::from_micros(timeout_us)).await;
                    if self.handle_receive(&mut run, plan, message, observer).await {
                        run.stall_deadline_us = None;
                    } else if window_full {
                        self.stop_if_stalled(&mut run, plan, idle_us).await;
                    }
                }
                PhaseState::Draining => {
                    let now = self.clock.now_us();
                    if run.store.in_flight() == 0 || now >= run.drain_deadline_us {
                        run.state = PhaseState::Done;
                        continue;
                    }

                    let timeout = Duration::from_micros(run.drain_deadline_us - now);
                    let message = self.transport.receive(timeout).await;
                    if self.handle_receive(&mut run, plan, message, observer).await {
                        run.drain_deadline_us = self.clock.now_us().saturating_add(idle_us);
                    }
                }
                PhaseState::Done => break,
            }
        }

        let snapshot = run.stats.snapshot();
        self.logger
            .phase_finished(&correlation_id, &plan.label, &snapshot, run.stale_responses, run.unsent_probes)
            .await;

        PhaseReport {
            label: plan.label.clone(),
            snapshot,
            stale_responses: run.stale_responses,
            unsent_probes: run.unsent_probes,
            fault: run.fault,
        }
    }

    fn window_full(&self, run: &PhaseRun) -> bool {
        self.settings.window > 0 && run.store.in_flight() >= self.settings.window
    }

    async fn issue_probe(&mut self, run: &mut PhaseRun, plan: &PhasePlan) {
        let key = self.namer.next_name();
        let request = self.codec.build_probe_request(&key);
        let send_ts = self.clock.now_us();
        run.issued += 1;
        if !plan.is_flood() {
            run.next_deadline_us = send_ts.saturating_add(plan.interval_us);
        }

        if self.transport.send(request).await {
            match run.store.record(key, send_ts) {
                Ok(_) => run.stats.on_send(),
                Err(e) => {
                    self.logger.send_dropped(&e.to_string(), None).await;
                }
            }
            return;
        }

        let fault = self.transport.last_error();
        self.logger.send_dropped(&key, fault.as_ref()).await;
        if let Some(fault) = fault.filter(TransportFault::is_persistent) {
            run.fault = Some(fault);
        }
    }

    /// Returns true when the message completed a probe
    async fn handle_receive(
        &mut self,
        run: &mut PhaseRun,
        plan: &PhasePlan,
        message: Option<Message>,
        observer: &mut dyn MatchObserver,
    ) -> bool {
        let message = match message {
            Some(message) => message,
            None => {
                if let Some(fault) = self.transport.last_error().filter(TransportFault::is_persistent) {
                    run.fault = Some(fault);
                }
                return false;
            }
        };

        if !self.codec.is_response(&message) {
            self.logger.ignored_message(&format!("{:?}", message)).await;
            return false;
        }

        let name = match self.codec.extract_name(&message) {
            Some(name) => name,
            None => return false,
        };
        let payload_size = self.codec.extract_payload_size(&message);
        let receive_ts = self.clock.now_us();

        match run.store.match_and_complete(name, receive_ts, payload_size) {
            Ok(rtt_us) => {
                run.stats.on_match(rtt_us);
                if plan.trace {
                    observer.on_match(name, payload_size, rtt_us);
                }
                true
            }
            Err(_) => {
                run.stale_responses += 1;
                self.logger.stale_response(name).await;
                false
            }
        }
    }

    /// Stop issuing once the window has been full for a whole idle timeout
    ///
    /// Unmatched probes keep their slots; the phase drains them and the
    /// remaining attempts are reported as not sent.
    async fn stop_if_stalled(&mut self, run: &mut PhaseRun, plan: &PhasePlan, idle_us: u64) {
        let now = self.clock.now_us();
        match run.stall_deadline_us {
            Some(deadline) if now >= deadline => {}
            _ => return,
        }

        run.unsent_probes = plan.probe_count.saturating_sub(run.issued);
        run.stall_deadline_us = None;
        run.state = PhaseState::Draining;
        run.drain_deadline_us = now.saturating_add(idle_us);
        self.logger.window_stall(run.store.in_flight(), run.unsent_probes).await;
    }
}
