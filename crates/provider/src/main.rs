//! Cirrus Provider binary
//!
//! `schema` prints every resource schema as JSON. `apply` runs a plan
//! file against an in-memory simulated API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cirrus_provider::driver::{self, PlanFile};
use cirrus_provider::{CirrusProvider, ProviderConfig, Registry, SimulatedCloud};

#[derive(Parser)]
#[command(name = "cirrus-provider")]
#[command(about = "Cirrus provider - serverless workgroups and resource configurations")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CIRRUS_CONFIG")]
    config: Option<PathBuf>,

    /// Region override
    #[arg(long)]
    region: Option<String>,

    /// Polls a simulated resource takes to settle
    #[arg(long)]
    settle_polls: Option<u32>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print provider and resource schemas
    Schema,

    /// Apply a plan file against the simulated API
    Apply {
        /// Plan file (JSON)
        plan: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON output
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.unwrap_or_else(ProviderConfig::default_path);
    let mut config = ProviderConfig::load(&config_path)?;
    if let Some(region) = cli.region {
        config.region = region;
    }
    if let Some(settle_polls) = cli.settle_polls {
        config.simulator.settle_polls = settle_polls;
    }

    let mut cloud = SimulatedCloud::new(config.simulator);
    if !config.region.is_empty() {
        cloud = cloud.with_region(config.region.clone());
    }
    let provider = Arc::new(CirrusProvider::new(
        Registry::builtin(),
        Arc::new(cloud),
        config,
    ));

    match cli.command {
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&provider.schema())?);
        }
        Commands::Apply { plan } => {
            let plan = PlanFile::load(&plan)?;
            info!("Cirrus provider v{}", env!("CARGO_PKG_VERSION"));

            let stopper = provider.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received interrupt, cancelling in-flight operations");
                    stopper.stop();
                }
            });

            let outcomes = driver::run(&provider, &plan).await;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);

            if outcomes.iter().any(|o| o.failed()) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
