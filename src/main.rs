use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

use flashpath::admission::AdmissionController;
use flashpath::config::Config;
use flashpath::engine::{shutdown_channel, Engine};
use flashpath::evaluator::Evaluator;
use flashpath::planner::RoutePlanner;
use flashpath::port::LogSink;
use flashpath::provider::PaperExecutor;
use flashpath::scheduler::BatchScheduler;

#[derive(Parser)]
#[command(name = "flashpath", about = "Flash-loan arbitrage engine")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run scan cycles continuously until interrupted.
    Run,
    /// Run a single scan cycle and exit.
    Scan,
}

fn build_engine(config: &Config) -> Engine {
    let scheduler = BatchScheduler::new(
        config.scheduler.clone(),
        Arc::new(PaperExecutor),
        Arc::new(LogSink),
        None,
    );
    Engine::new(
        config.engine_settings(),
        config.build_detectors(),
        Evaluator::new(config.evaluator.clone()),
        RoutePlanner::new(config.planner.clone()),
        AdmissionController::new(config.admission.clone()),
        scheduler,
        config.build_feeds(),
        config.build_flash_providers(),
        None,
        config.build_gas_oracle(),
        None,
    )
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("flashpath starting");

    let engine = build_engine(&config);

    match cli.command {
        Command::Run => {
            let (shutdown_tx, shutdown_rx) = shutdown_channel();
            tokio::select! {
                result = engine.run(shutdown_rx) => {
                    if let Err(e) = result {
                        error!(error = %e, "Fatal error");
                        std::process::exit(1);
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    let _ = shutdown_tx.send(true);
                }
            }
        }
        Command::Scan => match engine.scan_cycle().await {
            Ok(report) => {
                info!(
                    found = report.opportunities_found,
                    executed = report.opportunities_executed,
                    succeeded = report.succeeded,
                    net_profit = %report.net_profit,
                    "Scan complete"
                );
            }
            Err(e) => {
                error!(error = %e, "Scan failed");
                std::process::exit(1);
            }
        },
    }

    info!("flashpath stopped");
}
