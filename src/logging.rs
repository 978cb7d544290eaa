//! Structured logging for the prober and the echo server
//!
//! Provides:
//! - Leveled, structured log entries with correlation IDs
//! - Console and JSON output formats
//! - Probe-level event logging for the pacing loop
//! - Error event logging for fatal transport faults

use crate::models::{Config, RunSnapshot};
use crate::transport::TransportFault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Errors that end the run
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Component that emitted the entry
    pub logger: String,
    /// Ties together the entries of one phase
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// One JSON object per line
    Json,
}

/// Output settings shared by every logger of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub min_level: LogLevel,
    pub format: LogFormat,
    pub use_color: bool,
}

impl LogSettings {
    /// debug selects Debug + JSON, verbose selects Info, otherwise only warnings and errors
    pub fn from_flags(verbose: bool, debug: bool, use_color: bool) -> Self {
        let min_level = if debug {
            LogLevel::Debug
        } else if verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            format: if debug { LogFormat::Json } else { LogFormat::Console },
            use_color,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            format: LogFormat::Console,
            use_color: true,
        }
    }
}

impl From<&Config> for LogSettings {
    fn from(config: &Config) -> Self {
        Self::from_flags(config.verbose, config.debug, config.enable_color)
    }
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    current_correlation_id: Option<String>,
    context_fields: HashMap<String, serde_json::Value>,
}

/// Leveled structured logger
///
/// Clones share the same context, so a session id set once is attached to
/// every entry written through any clone.
#[derive(Debug, Clone)]
pub struct Logger {
    settings: LogSettings,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self::with_settings(name, LogSettings::default())
    }

    pub fn with_settings(name: String, settings: LogSettings) -> Self {
        Self {
            settings,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger whose level follows the verbose/debug flags
    pub fn with_config(name: String, config: &Config) -> Self {
        Self::with_settings(name, LogSettings::from(config))
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.settings.min_level = level;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add a field attached to all subsequent entries
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

    /// Start a correlated operation and return its id
    pub async fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        {
            let mut context = self.context.write().await;
            context.current_correlation_id = Some(correlation_id.clone());
        }

        self.info(&format!("Started {}", operation_name))
            .correlation_id(&correlation_id)
            .field("operation", operation_name)
            .log()
            .await;

        correlation_id
    }

    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.info(&format!("Finished {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("success", success)
            .log()
            .await;

        let mut context = self.context.write().await;
        if context.current_correlation_id.as_deref() == Some(correlation_id) {
            context.current_correlation_id = None;
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Fatal, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.settings.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        if entry.correlation_id.is_none() {
            entry.correlation_id = context.current_correlation_id.clone();
        }
        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
        drop(context);

        let output = self.format_entry(&entry);

        // stdout carries reports only
        let _ = writeln!(io::stderr(), "{}", output);
    }

    fn format_entry(&self, entry: &LogEntry) -> String {
        match self.settings.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.settings.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => serde_json::json!({
                "error": "Failed to serialize log entry",
                "message": entry.message,
            })
            .to_string(),
        }
    }
}

/// Builder for a single log entry
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Attach the counters of a phase snapshot
    pub fn snapshot(self, snapshot: &RunSnapshot) -> Self {
        self.field("sent", snapshot.sent_count)
            .field("received", snapshot.received_count)
            .field("mean_rtt_us", snapshot.mean_rtt_us)
            .field("response_rate", snapshot.response_rate())
    }

    pub fn fault_info(self, fault: &TransportFault) -> Self {
        self.field("fault_kind", fault.kind.as_str())
            .field("fault_code", fault.code)
            .field("fault_message", &fault.message)
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Probe-level events from the pacing loop
#[derive(Debug, Clone)]
pub struct ProbeLogger {
    logger: Logger,
}

impl ProbeLogger {
    pub fn new(config: &Config) -> Self {
        Self::from_logger(Logger::with_config("PROBE".to_string(), config))
    }

    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Open a correlated phase; returns the phase correlation id
    pub async fn phase_started(&self, label: &str, probe_count: u64, interval_us: u64, window: usize) -> String {
        let correlation_id = self.logger.start_operation(&format!("phase '{}'", label)).await;
        self.logger
            .debug(&format!("Phase '{}' pacing", label))
            .field("phase", label)
            .field("probe_count", probe_count)
            .field("interval_us", interval_us)
            .field("window", window)
            .log()
            .await;
        correlation_id
    }

    pub async fn phase_finished(
        &self,
        correlation_id: &str,
        label: &str,
        snapshot: &RunSnapshot,
        stale_responses: u64,
        unsent_probes: u64,
    ) {
        self.logger
            .info(&format!("Phase '{}' done", label))
            .correlation_id(correlation_id)
            .snapshot(snapshot)
            .field("stale_responses", stale_responses)
            .field("unsent_probes", unsent_probes)
            .log()
            .await;
        self.logger.end_operation(correlation_id, &format!("phase '{}'", label), snapshot.received_count > 0).await;
    }

    /// A probe could not be sent and was dropped
    pub async fn send_dropped(&self, key: &str, fault: Option<&TransportFault>) {
        let mut builder = self.logger.debug(&format!("Dropped probe {}", key)).field("key", key);
        if let Some(fault) = fault {
            builder = builder.fault_info(fault);
        }
        builder.log().await;
    }

    /// A response arrived for a name with no unmatched probe
    pub async fn stale_response(&self, name: &str) {
        self.logger
            .debug(&format!("Ignored response for unknown or completed probe {}", name))
            .field("key", name)
            .log()
            .await;
    }

    pub async fn ignored_message(&self, description: &str) {
        self.logger.trace(&format!("Ignored non-response message: {}", description)).log().await;
    }

    /// The outstanding window stayed full for a whole idle timeout
    pub async fn window_stall(&self, in_flight: usize, unsent: u64) {
        self.logger
            .info(&format!("Window stalled with {} unanswered probes; {} not sent", in_flight, unsent))
            .field("in_flight", in_flight)
            .field("unsent", unsent)
            .log()
            .await;
    }
}

/// Error events with category context
#[derive(Debug, Clone)]
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("ERR".to_string(), config),
        }
    }

    /// A transport fault that ended the run
    pub async fn log_fatal_fault(&self, fault: &TransportFault, phase: &str) {
        self.logger
            .fatal(&format!("Transport failed during phase '{}': {}", phase, fault))
            .fault_info(fault)
            .field("phase", phase)
            .log()
            .await;
    }
}

/// Hands out loggers sharing one session id
pub struct LoggerFactory {
    settings: LogSettings,
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            settings: LogSettings::from(&config),
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_settings(name.to_string(), self.settings);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_probe_logger(&self) -> ProbeLogger {
        ProbeLogger::from_logger(self.create_logger("PROBE").await)
    }

    pub fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger::new(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FaultKind;

    fn sample_entry() -> LogEntry {
        let mut fields = HashMap::new();
        fields.insert("key".to_string(), serde_json::Value::String("value".to_string()));
        LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Probe matched".to_string(),
            logger: "PROBE".to_string(),
            correlation_id: Some("0123456789abcdef".to_string()),
            fields,
        }
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_settings_follow_flags() {
        let quiet = LogSettings::from_flags(false, false, true);
        assert_eq!(quiet.min_level, LogLevel::Warn);
        assert_eq!(quiet.format, LogFormat::Console);

        let verbose = LogSettings::from_flags(true, false, true);
        assert_eq!(verbose.min_level, LogLevel::Info);

        let debug = LogSettings::from_flags(true, true, false);
        assert_eq!(debug.min_level, LogLevel::Debug);
        assert_eq!(debug.format, LogFormat::Json);
        assert!(!debug.use_color);
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert!(logger.would_log(LogLevel::Debug));
        assert!(!logger.would_log(LogLevel::Trace));
    }

    #[test]
    fn test_set_level_raises_verbosity() {
        let mut logger = Logger::with_settings("SERVER".to_string(), LogSettings::from_flags(true, false, false));
        assert!(!logger.would_log(LogLevel::Debug));

        logger.set_level(LogLevel::Debug);
        assert!(logger.would_log(LogLevel::Debug));
    }

    #[tokio::test]
    async fn test_clones_share_context() {
        let logger = Logger::new("PROBE".to_string());
        let other = logger.clone();
        logger.set_session_id("session-1".to_string()).await;
        logger.add_context_field("peer".to_string(), "127.0.0.1:9695").await;

        let context = other.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some("session-1"));
        assert_eq!(
            context.context_fields.get("peer"),
            Some(&serde_json::Value::String("127.0.0.1:9695".to_string()))
        );
    }

    #[tokio::test]
    async fn test_operation_correlation_is_cleared() {
        let logger = Logger::new("TEST".to_string());
        let id = logger.start_operation("phase").await;
        assert_eq!(logger.context.read().await.current_correlation_id.as_deref(), Some(id.as_str()));

        logger.end_operation(&id, "phase", true).await;
        assert!(logger.context.read().await.current_correlation_id.is_none());
    }

    #[test]
    fn test_console_format() {
        let logger = Logger::with_settings(
            "PROBE".to_string(),
            LogSettings { use_color: false, ..Default::default() },
        );
        let output = logger.format_entry(&sample_entry());
        assert!(output.contains(" INFO [PROBE] Probe matched"));
        assert!(output.contains("[01234567]"));
        assert!(output.contains("key=\"value\""));
    }

    #[test]
    fn test_json_format() {
        let logger = Logger::with_settings("PROBE".to_string(), LogSettings::from_flags(false, true, false));
        let json = logger.format_entry(&sample_entry());
        let parsed: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.message, "Probe matched");
        assert_eq!(parsed.level, LogLevel::Info);
        assert_eq!(parsed.fields["key"], "value");
    }

    #[tokio::test]
    async fn test_probe_logger_events() {
        let probe_logger = ProbeLogger::new(&Config::default());
        let fault = TransportFault::new(FaultKind::Transient, 111, "refused");

        let id = probe_logger.phase_started("flood", 10, 0, 4).await;
        probe_logger.send_dropped("lci:/a/1", Some(&fault)).await;
        probe_logger.stale_response("lci:/a/0").await;
        probe_logger.window_stall(4, 6).await;
        probe_logger.phase_finished(&id, "flood", &RunSnapshot::default(), 1, 6).await;
        assert_eq!(probe_logger.logger().name(), "PROBE");
    }

    #[tokio::test]
    async fn test_fatal_fault_logging() {
        let err_logger = ErrorEventLogger::new(&Config::default());
        err_logger
            .log_fatal_fault(&TransportFault::new(FaultKind::Persistent, -1, "socket closed"), "flood")
            .await;
    }

    #[tokio::test]
    async fn test_logger_factory_shares_session() {
        let factory = LoggerFactory::new(Config::default());
        let logger = factory.create_logger("TEST").await;
        let probe_logger = factory.create_probe_logger().await;

        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some(factory.session_id.as_str()));
        assert_eq!(probe_logger.logger().name(), "PROBE");
    }
}
