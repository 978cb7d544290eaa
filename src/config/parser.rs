//! Configuration assembly from defaults, .env, environment and CLI

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Layers defaults, the .env file, environment variables and CLI flags
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Build and validate the final configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.env_file.as_deref(), self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// CLI flags win over everything set so far
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(mode) = cli.mode() {
            config.mode = Some(mode);
        }
        if let Some(count) = cli.count {
            config.probe_count = count;
        }
        if let Some(interval) = cli.interval {
            config.interval_ms = interval;
        }
        if let Some(size) = cli.size {
            config.payload_size = size;
        }
        if let Some(outstanding) = cli.outstanding {
            config.outstanding = outstanding;
        }
        if let Some(prefix) = &cli.locator {
            config.prefix = prefix.clone();
        }
        if let Some(server) = &cli.server {
            config.server_addr = server.clone();
        }
        if let Some(bind) = &cli.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(timeout) = cli.receive_timeout {
            config.receive_timeout_us = timeout;
        }

        if cli.color {
            config.enable_color = true;
        } else if cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Load the complete configuration for a parsed command line
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Human-readable dump of the effective configuration
pub fn display_config_summary(config: &Config) -> String {
    let mode = config.mode.map_or("none", |mode| mode.name());
    let window = if config.outstanding == 0 {
        "unbounded".to_string()
    } else {
        config.outstanding.to_string()
    };

    [
        format!("Mode: {}", mode),
        format!("Probe Count: {}", config.probe_count),
        format!("Interval: {} ms", config.interval_ms),
        format!("Payload Size: {} bytes", config.payload_size),
        format!("Outstanding Window: {}", window),
        format!("Name Prefix: {}", config.prefix),
        format!("Receive Timeout: {} us", config.receive_timeout_us),
        format!("Server: {}", config.server_addr),
        format!("Bind: {}", config.bind_addr),
        format!("Color Output: {}", config.enable_color),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ]
    .join("\n")
}
