use std::path::PathBuf;

use clap::Parser;

/// Collect runtime telemetry from network-function instances under test.
///
/// Polls a container-level and a host-level exposition endpoint, listens to
/// one metrics stream per entity, and appends one merged record per entity
/// per cycle to per-entity CSV logs.
#[derive(Debug, Parser)]
#[command(name = "nfprobe", version, about)]
pub struct Args {
    /// Collection interval in seconds
    #[arg(long, default_value_t = 1.0)]
    pub interval: f64,

    /// Total collection duration (e.g. "3600", "30m", "1h30m"); runs
    /// indefinitely when omitted
    #[arg(long)]
    pub duration: Option<String>,

    /// Output directory for per-entity CSV files
    #[arg(long, default_value = "./collected_data")]
    pub output_dir: PathBuf,

    /// Container-level metrics base URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub container_url: String,

    /// Host-level metrics base URL
    #[arg(long, default_value = "http://localhost:9100")]
    pub host_url: String,

    /// Entity list: comma-separated "name:container:stream_addr" triples;
    /// the stream address may itself contain colons (host:port)
    #[arg(long)]
    pub entities: String,

    /// Disable host-level metrics collection
    #[arg(long)]
    pub no_collect_host: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
