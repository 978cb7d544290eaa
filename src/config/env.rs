//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::RunMode;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `explicit`, or ./.env when no path is given
    ///
    /// A missing ./.env is fine; a missing explicit file is an error. Variables
    /// already set in the environment are not overwritten.
    pub fn load_env_file(explicit: Option<&Path>, debug: bool) -> Result<()> {
        let (path, required) = match explicit {
            Some(path) => (path, true),
            None => (Path::new(".env"), false),
        };

        if !path.exists() {
            if required {
                return Err(AppError::config(format!("Environment file not found: {}", path.display())));
            }
            if debug {
                eprintln!("No .env file found, using defaults and CLI arguments");
            }
            return Ok(());
        }

        dotenv::from_path(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        if debug {
            eprintln!("Loaded configuration from {}", path.display());
        }

        Ok(())
    }

    /// Example .env file content
    pub fn create_example_env_content() -> String {
        r#"# RTT Probe configuration
#
# Values here are defaults; environment variables and command-line
# flags override them.

# Run mode: flood, ping or all
# PROBE_MODE=ping

# Number of probes per phase
# PROBE_COUNT=10

# Milliseconds between probes in ping mode
# PROBE_INTERVAL_MS=1000

# Payload size the server answers with (max 64000)
# PROBE_PAYLOAD_SIZE=4096

# Maximum unanswered probes in flight, 0 for unbounded
# PROBE_OUTSTANDING=0

# Name prefix probes are issued under
# PROBE_PREFIX=lci:/localhost/ping

# Straggler wait after the last probe, in microseconds
# PROBE_RECEIVE_TIMEOUT_US=1000000

# Echo server address
# PROBE_SERVER_ADDR=127.0.0.1:9695

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Check one variable's format without applying it
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "PROBE_MODE" => {
                value.parse::<RunMode>()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_MODE value '{}': {}", value, e)))?;
            }
            "PROBE_COUNT" => {
                let count: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_COUNT value '{}': {}", value, e)))?;
                if count == 0 {
                    return Err(AppError::config("PROBE_COUNT must be greater than 0"));
                }
            }
            "PROBE_INTERVAL_MS" | "PROBE_RECEIVE_TIMEOUT_US" | "PROBE_OUTSTANDING" => {
                value.parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "PROBE_PAYLOAD_SIZE" => {
                let size: usize = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_PAYLOAD_SIZE value '{}': {}", value, e)))?;
                if size > crate::defaults::MAX_PAYLOAD_SIZE {
                    return Err(AppError::config(format!(
                        "PROBE_PAYLOAD_SIZE must be at most {}, got: {}",
                        crate::defaults::MAX_PAYLOAD_SIZE,
                        size
                    )));
                }
            }
            "PROBE_PREFIX" => crate::models::config::validate_prefix(value)?,
            "PROBE_SERVER_ADDR" => {
                value.parse::<std::net::SocketAddr>()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_SERVER_ADDR value '{}': {}", value, e)))?;
            }
            "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported variables as (name, description, example)
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROBE_MODE", "Run mode: flood, ping or all", "ping"),
            ("PROBE_COUNT", "Probes per phase", "10"),
            ("PROBE_INTERVAL_MS", "Milliseconds between probes in ping mode", "1000"),
            ("PROBE_PAYLOAD_SIZE", "Response payload size in bytes", "4096"),
            ("PROBE_OUTSTANDING", "Maximum unanswered probes in flight (0 = unbounded)", "0"),
            ("PROBE_PREFIX", "Name prefix probes are issued under", "lci:/localhost/ping"),
            ("PROBE_RECEIVE_TIMEOUT_US", "Straggler wait in microseconds", "1000000"),
            ("PROBE_SERVER_ADDR", "Echo server address", "127.0.0.1:9695"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    pub fn display_env_help() -> String {
        let mut help = String::from("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<26} {}\n", var, description));
            help.push_str(&format!("  {:<26} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Problems with the variables currently set
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value).err().map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{clear_probe_env, lock_env};
    use tempfile::NamedTempFile;

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("RTT Probe configuration"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("PROBE_MODE", "flood").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_COUNT", "5").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_PAYLOAD_SIZE", "64000").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_PREFIX", "lci:/a/b").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_SERVER_ADDR", "[::1]:9695").is_ok());
        assert!(EnvManager::validate_env_var("UNRELATED", "anything").is_ok());

        assert!(EnvManager::validate_env_var("PROBE_MODE", "storm").is_err());
        assert!(EnvManager::validate_env_var("PROBE_COUNT", "0").is_err());
        assert!(EnvManager::validate_env_var("PROBE_PAYLOAD_SIZE", "64001").is_err());
        assert!(EnvManager::validate_env_var("PROBE_INTERVAL_MS", "-1").is_err());
        assert!(EnvManager::validate_env_var("PROBE_PREFIX", "relative/path").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("PROBE_OUTSTANDING"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_validate_current_env() {
        let _guard = lock_env();
        clear_probe_env();
        assert!(EnvManager::validate_current_env().is_empty());

        std::env::set_var("PROBE_COUNT", "zero");
        let warnings = EnvManager::validate_current_env();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("PROBE_COUNT"));
        clear_probe_env();
    }

    #[test]
    fn test_env_file_does_not_override_environment() {
        let _guard = lock_env();
        clear_probe_env();
        std::env::set_var("PROBE_COUNT", "3");

        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"PROBE_COUNT=99\nPROBE_PAYLOAD_SIZE=128\n").unwrap();
        EnvManager::load_env_file(Some(file.path()), false).unwrap();

        assert_eq!(std::env::var("PROBE_COUNT").unwrap(), "3");
        assert_eq!(std::env::var("PROBE_PAYLOAD_SIZE").unwrap(), "128");
        clear_probe_env();
    }
}
