//! Report output for the client
//!
//! Plain and colored formatters behind one trait, plus the trace printer
//! used as the scheduler's match observer in ping mode.

mod colored;
mod formatter;

pub use self::colored::{ColoredFormatter, LatencyLevel};
pub use self::formatter::{statistics_line, FormattingOptions, PlainFormatter, ReportFormatter, NO_RESPONSES_DIAGNOSTIC};

use crate::executor::MatchObserver;
use std::io::Write;
use std::sync::Arc;

/// Chooses a formatter from the color and verbosity settings
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Arc<dyn ReportFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
        };

        if enable_color {
            Arc::new(ColoredFormatter::new(options))
        } else {
            Arc::new(PlainFormatter::new(options))
        }
    }

    pub fn create_plain_formatter() -> Arc<dyn ReportFormatter> {
        Self::create_formatter(false, false)
    }
}

/// Prints a trace line to stdout for every matched response
pub struct TracePrinter {
    formatter: Arc<dyn ReportFormatter>,
    lines: u64,
}

impl TracePrinter {
    pub fn new(formatter: Arc<dyn ReportFormatter>) -> Self {
        Self { formatter, lines: 0 }
    }

    /// Trace lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }
}

impl MatchObserver for TracePrinter {
    fn on_match(&mut self, name: &str, payload_size: usize, rtt_us: u64) {
        if let Ok(line) = self.formatter.format_trace(name, payload_size, rtt_us) {
            let mut stdout = std::io::stdout().lock();
            if writeln!(stdout, "{}", line).is_ok() {
                self.lines += 1;
            }
        }
    }
}
