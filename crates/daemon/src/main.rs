//! mqscaler - Main Entry Point
//! Polls one queue and launches detached consumers when it falls behind

mod cli;
mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

// Import workspace crates
use mqscaler_core::application::Autoscaler;
use mqscaler_core::domain::ScalingPolicy;
use mqscaler_core::port::PolicySource;
use mqscaler_infra_rabbitmq::ManagementApiInspector;

use cli::Cli;
use config::{ScalerSettings, SettingsPolicySource};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything resolved before the loop starts
#[derive(Debug)]
struct Startup {
    config_path: PathBuf,
    settings: ScalerSettings,
    policy: ScalingPolicy,
}

/// Load configuration and resolve the policy (fatal before the loop)
fn load(cli: &Cli) -> Result<Startup> {
    let (config_path, required) = cli.config_path();
    let settings = ScalerSettings::load(&config_path, required)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let policy = SettingsPolicySource::new(settings.clone())
        .resolve_policy(&cli.consumer)?
        .with_overrides(&cli.overrides());

    Ok(Startup {
        config_path,
        settings,
        policy,
    })
}

/// Wire the adapters and run until the iteration limit, a queue failure,
/// or `shutdown` resolves
async fn run<S>(startup: Startup, shutdown: S) -> Result<()>
where
    S: Future<Output = io::Result<()>>,
{
    let Startup {
        config_path,
        settings,
        policy,
    } = startup;

    info!(
        version = VERSION,
        consumer = %policy.queue.consumer,
        config = %config_path.display(),
        "mqscaler starting"
    );

    let inspector = Arc::new(
        ManagementApiInspector::new(settings.broker.management_config())
            .context("Failed to create queue inspector")?,
    );
    let launcher = Arc::new(settings.worker.launcher());

    let scaler = Autoscaler::new(policy, inspector, launcher)?;
    info!(command = %scaler.command(), "Worker command resolved");

    tokio::select! {
        result = scaler.run() => {
            let summary = result.context("Autoscaler stopped")?;
            info!(
                iterations = summary.iterations,
                launched = summary.launched,
                failed_launches = summary.failed_launches,
                "Autoscaler finished"
            );
        }
        signal = shutdown => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received. Exiting.");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Configuration and policy
    let startup = load(&cli)?;

    // 2. Initialize logging
    telemetry::init_logging(cli.log_format, cli.verbose || startup.policy.debug)?;

    // 3. Run until the iteration limit, a queue failure, or Ctrl+C
    run(startup, tokio::signal::ctrl_c()).await
}
