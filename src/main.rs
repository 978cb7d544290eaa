//! RTT Probe - Main CLI Application
//!
//! Sends uniquely named probe requests to an echo server and reports the
//! number of probes sent and answered and the mean round-trip time.

use clap::Parser;
use rtt_probe::{
    app::App,
    cli::Cli,
    config::load_config,
    error::{AppError, ErrorReporter, Result},
    BUILD_TIME, GIT_COMMIT, PKG_NAME, VERSION,
};
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue with the command line you ran.");
        process::exit(99);
    }));

    // Parse command line arguments
    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    if let Err(e) = run_application(cli).await {
        reporter.report_error(&e);
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{} v{} ({}, built {})", PKG_NAME, VERSION, GIT_COMMIT, BUILD_TIME);
        eprintln!("Debug mode enabled");
        eprintln!();
    }

    let config = load_config(cli)?;
    App::new(config).run().await?;
    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Select a mode with --ping, --flood or --all (or PROBE_MODE)");
            eprintln!("  - Payload size must be at most {} bytes", rtt_probe::defaults::MAX_PAYLOAD_SIZE);
            eprintln!("  - Run with --help to list every option");
        }
        AppError::Validation(_) => {
            eprintln!();
            eprintln!("Name prefixes look like lci:/some/prefix");
        }
        AppError::Transport(_) => {
            eprintln!();
            eprintln!("Transport troubleshooting:");
            eprintln!("  - Make sure rttp-server is running and serving the same prefix");
            eprintln!("  - Check the --server address and any firewall between the hosts");
        }
        AppError::Io(_) => {
            eprintln!();
            eprintln!("Socket troubleshooting:");
            eprintln!("  - Check that the --bind address exists on this host and is free");
        }
        _ => {}
    }
}
