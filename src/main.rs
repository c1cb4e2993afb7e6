//! laundry - machine reservation engine
//!
//! Runs the load simulation against the workflow engine and prints a cost
//! report.

use clap::{Parser, Subcommand};
use laundry_server::{Config, Metrics, Simulation, TokenIdentityProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "laundry")]
#[command(about = "Laundry machine reservation engine and load simulator")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "LAUNDRY_CONFIG")]
    config: Option<PathBuf>,

    /// Number of independent runs
    #[arg(long)]
    iterations: Option<u32>,

    /// Requests per run
    #[arg(long)]
    runs: Option<u32>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Probability that a machine start faults
    #[arg(long)]
    failure_rate: Option<f64>,

    /// Print Prometheus metrics after the report
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load simulation (default)
    Simulate,

    /// Hash a token for use in auth.token_hashes
    HashToken {
        /// The token to hash
        token: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::HashToken { token }) = &cli.command {
        println!("{}", TokenIdentityProvider::hash_token(token));
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match Config::load_from(cli.config.as_deref()) {
        Ok(c) => {
            if let Some(ref path) = cli.config {
                tracing::info!("Loaded config from {}", path.display());
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.load_secrets() {
        tracing::error!("Failed to load auth secrets: {}", e);
        return Err(e.into());
    }

    if let Some(iterations) = cli.iterations {
        config.simulation.iterations = iterations;
    }
    if let Some(runs) = cli.runs {
        config.simulation.runs = runs;
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }
    if let Some(rate) = cli.failure_rate {
        config.simulation.hardware_failure_rate = rate;
    }
    if cli.metrics {
        config.metrics.enabled = true;
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let sim = &config.simulation;
    tracing::info!("Starting laundry load simulation");
    tracing::info!("  Iterations: {}", sim.iterations);
    tracing::info!("  Requests per run: {}", sim.runs);
    tracing::info!("  Machines: {} across {} locations", sim.machines, sim.locations);
    tracing::info!("  Hardware failure rate: {}", sim.hardware_failure_rate);
    tracing::info!("  Cache capacity: {}", config.cache.capacity);
    if config.auth.token_hashes.is_empty() {
        tracing::info!("  Authentication: simulation token only");
    } else {
        tracing::info!(
            "  Authentication: {} token(s)",
            config.auth.token_hashes.len()
        );
    }

    let mut simulation = Simulation::from_config(&config);
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(Metrics::new()?);
        simulation = simulation.with_metrics(metrics.clone());
        Some(metrics)
    } else {
        None
    };

    let report = simulation.run()?;
    println!("{}", report);

    if let Some(metrics) = metrics {
        let text = String::from_utf8(metrics.encode()?)?;
        println!("{}", text);
    }

    tracing::info!("Simulation complete ({} runs)", report.runs.len());
    Ok(())
}
