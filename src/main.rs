mod cli;
mod inventory;
mod orchestrator;
mod report;
mod runner;
mod sink;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use confsnap_session::tcp::TcpConnector;
use orchestrator::{FleetOrchestrator, Outcome, OrchestratorConfig};
use sink::OutputSink;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    let outcomes = match run(cli).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            // Startup failure: nothing was polled, no partial report exists
            error!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    if !outcomes.is_empty() {
        println!("{}", report::render(&outcomes));
    }

    let failed = report::failure_count(&outcomes);
    if failed > 0 {
        warn!("{} of {} devices failed", failed, outcomes.len());
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(cli: Cli) -> Result<Vec<Outcome>> {
    let devices = inventory::load_devices(&cli.devices)?;
    let credential = inventory::load_credential(&cli.credentials)?;
    let commands = inventory::load_commands(&cli.commands)?;

    info!(
        "polling {} devices with up to {} workers",
        devices.len(),
        cli.concurrency
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; letting in-flight devices finish");
            let _ = shutdown_tx.send(true);
        }
    });

    let config = OrchestratorConfig {
        device_type: cli.device_type,
        fast_mode: cli.fast,
        port: cli.port,
        concurrency: cli.concurrency,
        command_deadline: cli.command_timeout.map(Duration::from_secs),
    };

    let orchestrator = FleetOrchestrator::new(
        Arc::new(TcpConnector::new()),
        OutputSink::new(&cli.output_dir),
        config,
        shutdown_rx,
    );

    let outcomes = orchestrator.run(&devices, &credential, &commands).await?;
    Ok(outcomes)
}
