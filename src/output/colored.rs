//! Colored formatter for terminals
//!
//! Wraps the plain layout and colors the parts a reader scans for: the
//! mean delay by latency band, the diagnostic and the warnings.

use super::formatter::{FormattingOptions, PlainFormatter, ReportFormatter, NO_RESPONSES_DIAGNOSTIC};
use crate::{
    error::Result,
    executor::{PhasePlan, PhaseReport},
};
use colored::*;

/// Latency band of a round-trip time, for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyLevel {
    /// Under 1 ms
    Local,
    /// 1 ms to 10 ms
    Near,
    /// 10 ms to 100 ms
    Far,
    /// 100 ms and above
    Slow,
}

impl LatencyLevel {
    pub fn from_rtt_us(rtt_us: u64) -> Self {
        match rtt_us {
            0..=999 => Self::Local,
            1_000..=9_999 => Self::Near,
            10_000..=99_999 => Self::Far,
            _ => Self::Slow,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Local => Color::Green,
            Self::Near => Color::Cyan,
            Self::Far => Color::Yellow,
            Self::Slow => Color::Red,
        }
    }
}

/// ANSI colored formatter
pub struct ColoredFormatter {
    plain: PlainFormatter,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            plain: PlainFormatter::new(options),
        }
    }

    fn colored_rtt(rtt_us: u64) -> ColoredString {
        rtt_us.to_string().color(LatencyLevel::from_rtt_us(rtt_us).color()).bold()
    }
}

impl ReportFormatter for ColoredFormatter {
    fn format_header(&self, plan: &PhasePlan) -> Result<String> {
        Ok(format!(
            "{} {} {}",
            "===".bright_blue(),
            format!("{} ({})", plan.label, PlainFormatter::describe_plan(plan)).bold(),
            "===".bright_blue()
        ))
    }

    fn format_phase_report(&self, report: &PhaseReport) -> Result<String> {
        let snapshot = &report.snapshot;
        let mut lines = Vec::new();

        match snapshot.mean_rtt_us {
            Some(mean) => lines.push(format!(
                "Sent = {} : Received = {} : AvgDelay {} us",
                snapshot.sent_count.to_string().bold(),
                snapshot.received_count.to_string().bold(),
                Self::colored_rtt(mean)
            )),
            None => lines.push(NO_RESPONSES_DIAGNOSTIC.red().to_string()),
        }

        if self.plain.options().verbose_mode {
            lines.push(PlainFormatter::details_line(report).dimmed().to_string());
        }

        for warning in PlainFormatter::phase_warnings(report) {
            lines.push(self.format_warning(&warning)?);
        }

        Ok(lines.join("\n"))
    }

    fn format_trace(&self, name: &str, payload_size: usize, rtt_us: u64) -> Result<String> {
        Ok(format!(
            "{} bytes from {}: time={} us",
            payload_size,
            name.cyan(),
            Self::colored_rtt(rtt_us)
        ))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", "Warning:".yellow().bold(), warning.yellow()))
    }
}
