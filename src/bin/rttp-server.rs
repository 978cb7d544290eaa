//! RTT Probe echo server
//!
//! Answers every probe request under the configured prefix with a response
//! of the same name carrying a fixed-size payload.

use clap::Parser;
use rtt_probe::{
    cli::ServerCli,
    error::{AppError, ErrorReporter, Result},
    logging::{LogLevel, LogSettings, Logger},
    server::EchoServer,
};
use std::net::SocketAddr;
use std::process;

#[tokio::main]
async fn main() {
    let cli = ServerCli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    if let Err(e) = run_server(cli).await {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}

async fn run_server(cli: ServerCli) -> Result<()> {
    let addr = cli
        .bind
        .parse::<SocketAddr>()
        .map_err(|e| AppError::config(format!("Invalid bind address '{}': {}", cli.bind, e)))?;

    // Lifecycle at info level; --verbose adds a line per request
    let settings = LogSettings::from_flags(true, cli.debug, cli.use_colors());
    let mut logger = Logger::with_settings("SERVER".to_string(), settings);
    if cli.verbose {
        logger.set_level(LogLevel::Debug);
    }

    let mut server = EchoServer::bind(addr, &cli.locator, cli.size).await?.with_logger(logger);
    println!("Listening on {} for {}", server.local_addr()?, server.prefix());

    let stats = server
        .serve_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    println!(
        "Answered {} requests ({} ignored, {} send failures)",
        stats.answered, stats.ignored, stats.send_failures
    );
    Ok(())
}
