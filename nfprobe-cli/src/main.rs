mod cli;
mod config;
mod output;

use std::process;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use collector::{
    CONTAINER_SOURCE, HOST_SOURCE, Orchestrator, OrchestratorConfig, PullCollector,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::Args;
use crate::output::CsvEntityWriter;

/// Bound on any single pull fetch; a tick may block for at most this long
/// per source per entity.
const PULL_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("application error: {e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    // Configuration failures are fatal before the loop starts.
    if !(args.interval > 0.0) {
        bail!("interval must be positive, got {}", args.interval);
    }
    let duration = args
        .duration
        .as_deref()
        .map(config::parse_duration)
        .transpose()
        .context("invalid --duration")?
        .map(Duration::from_secs_f64);
    let entities = config::parse_entities(&args.entities).context("invalid --entities")?;

    info!("starting collection with interval={}s", args.interval);
    info!("output directory: {}", args.output_dir.display());
    info!(
        "entities: {:?}",
        entities.iter().map(|e| e.name.as_str()).collect::<Vec<_>>()
    );

    let client = reqwest::Client::builder()
        .timeout(PULL_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let orchestrator = Orchestrator::new(
        PullCollector::new(client.clone(), &args.container_url, &CONTAINER_SOURCE),
        PullCollector::new(client, &args.host_url, &HOST_SOURCE),
        entities,
        CsvEntityWriter::new(&args.output_dir),
        OrchestratorConfig {
            interval: Duration::from_secs_f64(args.interval),
            duration,
            collect_host: !args.no_collect_host,
        },
        shutdown_token(),
    );

    orchestrator.run().await?;
    info!("data saved to {}", args.output_dir.display());
    Ok(())
}

/// Cancellation token wired to SIGINT/SIGTERM.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();

    let signal_token = token.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut terminate =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        info!("received shutdown signal, stopping collection");
        signal_token.cancel();
    });

    token
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
