//! RideSafe replay - runs a recorded session through the trip monitor

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use replay::{init_logging, parse_recording, replay, JsonLinesSink};
use trip_monitor::{SafetyConfig, TripSession};

#[derive(Parser, Debug)]
#[command(
    name = "ridesafe-replay",
    version,
    about = "Replay a recorded ride through drowsiness and crash monitoring"
)]
struct Args {
    /// JSON-lines recording
    #[arg(value_name = "PATH")]
    recording: PathBuf,

    /// Configuration file (TOML/JSON); RIDESAFE_* environment variables override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print Prometheus metrics after the summary
    #[arg(long)]
    metrics: bool,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs)?;

    info!("=== RideSafe replay v{} ===", env!("CARGO_PKG_VERSION"));

    let prometheus = if args.metrics {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install metrics recorder")?;
        Some(handle)
    } else {
        None
    };

    let config = SafetyConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let file = File::open(&args.recording)
        .with_context(|| format!("Failed to open {}", args.recording.display()))?;
    let records = parse_recording(BufReader::new(file))
        .with_context(|| format!("Failed to read {}", args.recording.display()))?;

    let stdout = io::stdout();
    let mut session = TripSession::new(config, JsonLinesSink::new(stdout.lock()))?;
    let summary = replay(&records, &mut session)?;

    let mut out = session.into_sink().into_inner();
    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;

    if let Some(handle) = prometheus {
        write!(out, "{}", handle.render())?;
    }
    Ok(())
}
