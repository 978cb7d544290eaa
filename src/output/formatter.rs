//! Report formatting trait and the plain text implementation

use crate::{
    error::{AppError, Result},
    executor::{PhasePlan, PhaseReport},
    models::RunSnapshot,
};
use std::fmt::Write as _;

/// Shown in place of the statistics line when nothing was received
pub const NO_RESPONSES_DIAGNOSTIC: &str = "No packets were received. Check to make sure the client and server \
are configured correctly and that the server is running.";

/// Formats everything the client prints to stdout
pub trait ReportFormatter: Send + Sync {
    /// Header naming a phase before it runs
    fn format_header(&self, plan: &PhasePlan) -> Result<String>;

    /// Statistics line, or the no-response diagnostic, for a finished phase
    fn format_phase_report(&self, report: &PhaseReport) -> Result<String>;

    /// One line per matched response in traced phases
    fn format_trace(&self, name: &str, payload_size: usize, rtt_us: u64) -> Result<String>;

    fn format_warning(&self, warning: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone, Default)]
pub struct FormattingOptions {
    pub enable_color: bool,
    /// Add stale/released counts and the response rate under each report
    pub verbose_mode: bool,
}

/// `Sent = <sent> : Received = <received> : AvgDelay <mean> us`, or `None` with no responses
pub fn statistics_line(snapshot: &RunSnapshot) -> Option<String> {
    snapshot.mean_rtt_us.map(|mean| {
        format!(
            "Sent = {} : Received = {} : AvgDelay {} us",
            snapshot.sent_count, snapshot.received_count, mean
        )
    })
}

/// Plain text formatter for pipes, logs and `--no-color`
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    pub(crate) fn describe_plan(plan: &PhasePlan) -> String {
        if plan.is_flood() {
            format!("{} probes, flood", plan.probe_count)
        } else {
            format!("{} probes, every {} us", plan.probe_count, plan.interval_us)
        }
    }

    pub(crate) fn details_line(report: &PhaseReport) -> String {
        format!(
            "  response rate {:.1}%, {} unanswered, {} stale responses, {} not sent after window stall",
            report.snapshot.response_rate(),
            report.snapshot.unanswered(),
            report.stale_responses,
            report.unsent_probes
        )
    }

    /// Conditions that cut a phase short, in the order they happened
    pub(crate) fn phase_warnings(report: &PhaseReport) -> Vec<String> {
        let mut warnings = Vec::new();
        if report.unsent_probes > 0 {
            warnings.push(format!(
                "phase '{}' stopped sending after the window stalled; {} probes not sent",
                report.label, report.unsent_probes
            ));
        }
        if let Some(fault) = &report.fault {
            warnings.push(format!("phase '{}' ended early: {}", report.label, fault));
        }
        warnings
    }
}

impl ReportFormatter for PlainFormatter {
    fn format_header(&self, plan: &PhasePlan) -> Result<String> {
        Ok(format!("=== {} ({}) ===", plan.label, Self::describe_plan(plan)))
    }

    fn format_phase_report(&self, report: &PhaseReport) -> Result<String> {
        let mut output = String::new();

        match statistics_line(&report.snapshot) {
            Some(line) => output.push_str(&line),
            None => output.push_str(NO_RESPONSES_DIAGNOSTIC),
        }

        if self.options.verbose_mode {
            write!(output, "\n{}", Self::details_line(report))
                .map_err(|e| AppError::io(format!("Failed to format report: {}", e)))?;
        }

        for warning in Self::phase_warnings(report) {
            write!(output, "\n{}", self.format_warning(&warning)?)
                .map_err(|e| AppError::io(format!("Failed to format report: {}", e)))?;
        }

        Ok(output)
    }

    fn format_trace(&self, name: &str, payload_size: usize, rtt_us: u64) -> Result<String> {
        Ok(format!("{} bytes from {}: time={} us", payload_size, name, rtt_us))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("Warning: {}", warning))
    }
}
