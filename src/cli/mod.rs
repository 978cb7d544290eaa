//! Command-line interfaces for the probe client and the echo server

use crate::types::RunMode;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// RTT Probe - measures round-trip latency against an echo server
#[derive(Parser, Debug, Clone)]
#[command(name = "rttp")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").args(["ping", "flood", "all"]).multiple(false)))]
#[command(after_help = "Example:\n    rttp -l lci:/some/prefix -c 100 -f\n\nThe echo server (rttp-server) must be running.")]
pub struct Cli {
    /// Ping mode: one probe per interval, with a line per response
    #[arg(short, long)]
    pub ping: bool,

    /// Flood mode: send as fast as the outstanding window allows
    #[arg(short, long)]
    pub flood: bool,

    /// Run a 100-probe flood phase, then a 10-probe paced phase
    #[arg(short, long)]
    pub all: bool,

    /// Number of probes to send
    #[arg(short, long, value_parser = parse_positive_count)]
    pub count: Option<u64>,

    /// Interval in milliseconds between probes in ping mode
    #[arg(short, long, value_name = "MS")]
    pub interval: Option<u64>,

    /// Payload size in bytes the server should answer with
    #[arg(short, long, value_name = "BYTES")]
    pub size: Option<usize>,

    /// Maximum number of unanswered probes in flight (0 = unbounded)
    #[arg(short, long, value_name = "N")]
    pub outstanding: Option<usize>,

    /// Name prefix probes are issued under
    #[arg(short, long, value_name = "PREFIX")]
    pub locator: Option<String>,

    /// Echo server address
    #[arg(long, value_name = "ADDR")]
    pub server: Option<String>,

    /// Local address to bind the client socket to
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// How long to wait for stragglers, in microseconds
    #[arg(long, value_name = "US")]
    pub receive_timeout: Option<u64>,

    /// Load settings from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Check for conflicting flags
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        Ok(())
    }

    /// Mode selected by flag, if any
    pub fn mode(&self) -> Option<RunMode> {
        if self.ping {
            Some(RunMode::Ping)
        } else if self.flood {
            Some(RunMode::Flood)
        } else if self.all {
            Some(RunMode::All)
        } else {
            None
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// RTT Probe echo server
#[derive(Parser, Debug, Clone)]
#[command(name = "rttp-server")]
#[command(version, about = "Answers probe requests under a name prefix", long_about = None)]
pub struct ServerCli {
    /// Name prefix to serve
    #[arg(short, long, value_name = "PREFIX", default_value = crate::defaults::DEFAULT_PREFIX)]
    pub locator: String,

    /// Payload size of every response, in bytes
    #[arg(short, long, value_name = "BYTES", default_value_t = crate::defaults::DEFAULT_PAYLOAD_SIZE)]
    pub size: usize,

    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = crate::defaults::DEFAULT_SERVER_BIND_ADDR)]
    pub bind: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Log every request
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl ServerCli {
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

fn parse_positive_count(s: &str) -> Result<u64, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid count: {}", s));
    }

    match s.parse::<u64>() {
        Ok(0) => Err("Count must be greater than 0".to_string()),
        Ok(count) => Ok(count),
        Err(_) => Err(format!("Invalid count: {}", s)),
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing_short_flags() {
        let cli = Cli::parse_from(["rttp", "-f", "-c", "100", "-s", "64", "-o", "8", "-l", "lci:/some/prefix"]);
        assert_eq!(cli.mode(), Some(RunMode::Flood));
        assert_eq!(cli.count, Some(100));
        assert_eq!(cli.size, Some(64));
        assert_eq!(cli.outstanding, Some(8));
        assert_eq!(cli.locator.as_deref(), Some("lci:/some/prefix"));
        assert_eq!(cli.interval, None);
    }

    #[test]
    fn test_cli_parsing_long_flags() {
        let cli = Cli::parse_from([
            "rttp",
            "--ping",
            "--interval", "250",
            "--server", "10.0.0.1:9695",
            "--receive-timeout", "500000",
            "--no-color",
            "--verbose",
            "--debug",
        ]);
        assert_eq!(cli.mode(), Some(RunMode::Ping));
        assert_eq!(cli.interval, Some(250));
        assert_eq!(cli.server.as_deref(), Some("10.0.0.1:9695"));
        assert_eq!(cli.receive_timeout, Some(500_000));
        assert!(!cli.use_colors());
        assert!(cli.verbose && cli.debug);
    }

    #[test]
    fn test_mode_flags_conflict() {
        assert!(Cli::try_parse_from(["rttp", "-p", "-f"]).is_err());
        assert!(Cli::try_parse_from(["rttp", "--all", "--flood"]).is_err());
    }

    #[test]
    fn test_mode_is_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["rttp", "-c", "5"]).unwrap();
        assert_eq!(cli.mode(), None);
    }

    #[test]
    fn test_count_rejects_zero_and_garbage() {
        assert!(Cli::try_parse_from(["rttp", "-f", "-c", "0"]).is_err());
        assert!(Cli::try_parse_from(["rttp", "-f", "-c", "+5"]).is_err());
        assert!(Cli::try_parse_from(["rttp", "-f", "-c", "ten"]).is_err());
        assert!(parse_positive_count("7").is_ok());
    }

    #[test]
    fn test_color_flags_conflict() {
        let cli = Cli::parse_from(["rttp", "-f", "--color", "--no-color"]);
        assert!(cli.validate().is_err());

        let forced = Cli::parse_from(["rttp", "-f", "--color"]);
        assert!(forced.validate().is_ok());
        assert!(forced.use_colors());
    }

    #[test]
    fn test_server_cli_defaults() {
        let cli = ServerCli::parse_from(["rttp-server"]);
        assert_eq!(cli.locator, crate::defaults::DEFAULT_PREFIX);
        assert_eq!(cli.size, crate::defaults::DEFAULT_PAYLOAD_SIZE);
        assert_eq!(cli.bind, crate::defaults::DEFAULT_SERVER_BIND_ADDR);

        let custom = ServerCli::parse_from(["rttp-server", "-l", "lci:/x", "-s", "16", "--bind", "127.0.0.1:0"]);
        assert_eq!(custom.locator, "lci:/x");
        assert_eq!(custom.size, 16);
    }

    #[test]
    fn test_color_support_detection() {
        std::env::set_var("NO_COLOR", "1");
        assert!(!supports_color());
        std::env::remove_var("NO_COLOR");
    }
}
