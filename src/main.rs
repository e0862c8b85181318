//! pulsecam - fingertip-camera vital signs monitor
//!
//! # Usage
//!
//! ```bash
//! # Run against the synthetic fingertip generator
//! cargo run --release -- simulate --duration-s 30
//!
//! # Replay a recorded sample file and export the session
//! cargo run --release -- replay --input session.csv --export-dir ./exports
//! ```
//!
//! # Environment Variables
//!
//! - `PULSECAM_CONFIG`: Path to the TOML configuration file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

use pulsecam::acquisition::{CsvReplaySource, SampleSource, SyntheticConfig, SyntheticSource};
use pulsecam::config::MonitorConfig;
use pulsecam::pipeline::{MonitorState, PpgPipeline};
use pulsecam::session::SessionRecorder;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pulsecam")]
#[command(about = "Fingertip-camera vital signs monitor")]
#[command(version)]
struct CliArgs {
    /// Override the configuration file path
    #[arg(long, env = "PULSECAM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline against the synthetic fingertip generator
    Simulate {
        /// Simulated heart rate in BPM
        #[arg(long, default_value = "72")]
        bpm: f64,

        /// Run length in seconds
        #[arg(long, default_value = "30")]
        duration_s: u64,

        /// Probability per beat of an ectopic beat
        #[arg(long, default_value = "0.0")]
        ectopic: f64,

        /// Emit samples as fast as possible instead of real time
        #[arg(long)]
        fast: bool,

        /// Directory to export the recorded session into
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// Replay a recorded sample CSV through the pipeline
    Replay {
        /// Path to the `timestamp,red,green[,finger]` sample file
        #[arg(long)]
        input: PathBuf,

        /// Directory to export the recorded session into
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => MonitorConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MonitorConfig::load().context("loading config")?,
    };

    match args.command {
        Command::Simulate {
            bpm,
            duration_s,
            ectopic,
            fast,
            export_dir,
        } => {
            let synthetic = SyntheticSource::new(SyntheticConfig {
                bpm,
                sample_rate_hz: config.filter.sampling_rate_hz,
                ectopic_probability: ectopic,
                realtime: !fast,
                ..SyntheticConfig::default()
            });
            let sample_budget =
                (duration_s as f64 * config.filter.sampling_rate_hz).round() as u64;
            run_monitor(config, Box::new(synthetic), Some(sample_budget), export_dir).await
        }
        Command::Replay { input, export_dir } => {
            let replay = CsvReplaySource::load(&input)
                .with_context(|| format!("loading replay file {}", input.display()))?;
            run_monitor(config, Box::new(replay), None, export_dir).await
        }
    }
}

/// Wire the source, pipeline, and recorder together and run to completion.
async fn run_monitor(
    config: MonitorConfig,
    mut source: Box<dyn SampleSource>,
    sample_budget: Option<u64>,
    export_dir: Option<PathBuf>,
) -> Result<()> {
    let state = Arc::new(RwLock::new(MonitorState::default()));
    let shutdown = Arc::new(AtomicBool::new(false));
    let (sample_tx, sample_rx) = mpsc::channel(256);
    let (session_tx, session_rx) = mpsc::channel(8_192);

    let mut pipeline = PpgPipeline::new(&config);
    let pipeline_state = state.clone();
    let pipeline_shutdown = shutdown.clone();
    let pipeline_task = tokio::spawn(async move {
        pipeline
            .run(sample_rx, pipeline_state, pipeline_shutdown, Some(session_tx))
            .await;
    });

    let start_ms = chrono::Utc::now().timestamp_millis();
    let recorder_task = tokio::spawn(SessionRecorder::new(start_ms, session_rx).run());

    let mut fed: u64 = 0;
    while let Some(sample) = source.next_sample().await.context("acquiring sample")? {
        sample_tx.send(sample).await.context("pipeline stopped")?;
        fed += 1;
        if sample_budget.is_some_and(|budget| fed >= budget) {
            break;
        }
    }
    drop(sample_tx);
    shutdown.store(true, Ordering::Relaxed);

    pipeline_task.await.context("pipeline task panicked")?;
    let session = recorder_task.await.context("recorder task panicked")?;

    let final_state = state.read().await;
    info!(
        samples = fed,
        processed = final_state.samples_processed,
        idle = final_state.samples_idle,
        bpm = final_state.latest.bpm,
        spo2 = final_state.latest.spo2,
        signal_quality = final_state.latest.signal_quality,
        status = %final_state.status,
        "Monitoring finished"
    );

    if let Some(dir) = export_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        let (csv_path, json_path) = session
            .export_to_dir(&dir)
            .context("exporting session")?;
        info!(csv = %csv_path.display(), json = %json_path.display(), "Export written");
    }

    Ok(())
}
