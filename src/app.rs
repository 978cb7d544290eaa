//! Main application orchestration and execution

use crate::{
    codec::{ProbeNamer, WireCodec},
    config::{display_config_summary, validate_config},
    error::{AppError, Result},
    executor::{NoTrace, PacingScheduler, PhasePlan, PhaseReport, SchedulerSettings, SystemClock},
    logging::LoggerFactory,
    models::Config,
    output::{OutputFormatterFactory, ReportFormatter, TracePrinter},
    transport::{TransportChannel, UdpTransport},
};
use std::sync::Arc;

/// Runs every phase of the configured mode against the echo server
pub struct App {
    config: Config,
    formatter: Arc<dyn ReportFormatter>,
    loggers: LoggerFactory,
}

impl App {
    pub fn new(config: Config) -> Self {
        let formatter = OutputFormatterFactory::create_formatter(config.enable_color, config.verbose);
        let loggers = LoggerFactory::new(config.clone());
        Self { config, formatter, loggers }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the application
    ///
    /// Phase reports are printed as each phase finishes, so a transport
    /// failure still leaves the partial statistics on stdout before the
    /// error is returned.
    pub async fn run(self) -> Result<Vec<PhaseReport>> {
        let warnings = validate_config(&self.config)?;
        for warning in &warnings {
            eprintln!("{}", warning.format(self.config.enable_color));
        }

        if self.config.debug {
            eprintln!("Configuration Summary:");
            eprintln!("{}\n", display_config_summary(&self.config));
        }

        let plans = PhasePlan::for_config(&self.config)?;
        let transport = UdpTransport::connect(
            self.config.bind_socket_addr()?,
            self.config.server_socket_addr()?,
            &self.config.prefix,
        )
        .await?;

        let probe_logger = self.loggers.create_probe_logger().await;
        probe_logger
            .logger()
            .add_context_field("peer".to_string(), transport.peer_addr().to_string())
            .await;
        let mut scheduler = PacingScheduler::new(
            transport,
            WireCodec::new(),
            SystemClock,
            ProbeNamer::new(&self.config.prefix, self.config.payload_size),
            SchedulerSettings::from(&self.config),
        )
        .with_logger(probe_logger);

        let result = self.run_plans(&mut scheduler, &plans).await;
        scheduler.transport_mut().close().await;
        result
    }

    async fn run_plans(
        &self,
        scheduler: &mut PacingScheduler<UdpTransport, WireCodec, SystemClock>,
        plans: &[PhasePlan],
    ) -> Result<Vec<PhaseReport>> {
        let show_headers = plans.len() > 1 || self.config.verbose;
        let mut reports = Vec::with_capacity(plans.len());

        for plan in plans {
            if show_headers {
                println!("{}", self.formatter.format_header(plan)?);
            }

            let report = if plan.trace {
                let mut printer = TracePrinter::new(self.formatter.clone());
                scheduler.run_phase(plan, &mut printer).await
            } else {
                scheduler.run_phase(plan, &mut NoTrace).await
            };

            println!("{}", self.formatter.format_phase_report(&report)?);

            if let Some(fault) = &report.fault {
                self.loggers
                    .create_error_logger()
                    .log_fatal_fault(fault, &report.label)
                    .await;
                return Err(report.error().unwrap_or_else(|| AppError::transport(fault.to_string())));
            }

            reports.push(report);
        }

        Ok(reports)
    }
}
