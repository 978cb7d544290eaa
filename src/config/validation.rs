//! Configuration warnings beyond hard validation

use crate::{
    error::Result,
    models::Config,
    types::RunMode,
};
use colored::*;

/// Window sizes above this rarely help on a single path
const LARGE_WINDOW: usize = 10_000;
/// Idle timeouts below this often end draining before stragglers arrive
const SHORT_IDLE_TIMEOUT_US: u64 = 10_000;
const LARGE_PROBE_COUNT: u64 = 1_000_000;

/// Produces warnings for configurations that are valid but suspicious
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run hard validation, then collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::check_pacing(config));
        warnings.extend(Self::check_window(config));
        warnings.extend(Self::check_timeouts(config));
        Ok(warnings)
    }

    fn check_pacing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.mode == Some(RunMode::Ping) && config.interval_ms == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Ping mode with a 0 ms interval sends back to back, like flood mode".to_string(),
            ));
        }

        if config.mode == Some(RunMode::All) && config.probe_count != crate::defaults::DEFAULT_PROBE_COUNT {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "--all uses fixed phase sizes ({} flood, {} paced); count {} is ignored",
                    crate::defaults::MEDIUM_NUMBER_OF_PINGS,
                    crate::defaults::SMALL_NUMBER_OF_PINGS,
                    config.probe_count
                ),
            ));
        }

        if config.probe_count > LARGE_PROBE_COUNT {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} probes will keep one record each in memory until the phase ends", config.probe_count),
            ));
        }

        warnings
    }

    fn check_window(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.outstanding > LARGE_WINDOW {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Outstanding window of {} is effectively unbounded", config.outstanding),
            ));
        }

        if config.outstanding > 0 && config.mode == Some(RunMode::Ping) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Ping mode rarely fills the outstanding window".to_string(),
            ));
        }

        warnings
    }

    fn check_timeouts(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.receive_timeout_us < SHORT_IDLE_TIMEOUT_US {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Receive timeout of {} us may end the run before late responses arrive",
                    config.receive_timeout_us
                ),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
