use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wave_recorder::{
    AudioBackendFactory, AudioFile, Config, Controller, RecorderError, SessionStats, WavBuffer,
};

/// Record from the configured synthetic source, flushing periodically
#[derive(Debug, Parser)]
#[command(name = "wave-recorder", version)]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/wave-recorder")]
    config: String,

    /// Total recording time
    #[arg(long, default_value_t = 3)]
    seconds: u64,

    /// Interval between flushes
    #[arg(long, default_value_t = 1000)]
    flush_every_ms: u64,

    /// Print a JSON summary instead of log lines
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct BufferSummary {
    bytes: usize,
    frames: usize,
    channels: u16,
    sample_rate: u32,
    duration_secs: f64,
    peak: i16,
}

#[derive(Debug, Serialize)]
struct Summary {
    buffers: Vec<BufferSummary>,
    session: SessionStats,
}

fn summarize(wav: &WavBuffer) -> Result<BufferSummary> {
    let decoded =
        AudioFile::from_wav_bytes(wav.as_bytes()).context("Encoded buffer did not parse")?;

    Ok(BufferSummary {
        bytes: wav.len(),
        frames: decoded.frame_count(),
        channels: decoded.channels,
        sample_rate: decoded.sample_rate,
        duration_secs: wav.duration_secs(),
        peak: decoded
            .samples
            .iter()
            .map(|s| s.saturating_abs())
            .max()
            .unwrap_or(0),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Wave Recorder v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Engine: {}Hz, {}-frame quanta, {:?} quantization",
        cfg.engine.sample_rate, cfg.engine.render_quantum_frames, cfg.engine.quantization
    );

    let source = AudioBackendFactory::create(cfg.audio_source()?, cfg.backend_config())
        .context("Failed to create audio source")?;

    let mut controller = Controller::new(cfg.controller_config()).with_source(source);
    controller.initialize().await?;
    controller.start_recording().await?;

    let mut buffers = Vec::new();
    let total = Duration::from_secs(args.seconds);
    let interval = Duration::from_millis(args.flush_every_ms.max(1));
    let started = tokio::time::Instant::now();

    while started.elapsed() + interval < total {
        tokio::time::sleep(interval).await;
        match controller.flush().await {
            Ok(Some(wav)) => buffers.push(summarize(&wav)?),
            Ok(None) => info!("Nothing buffered since the last flush"),
            Err(RecorderError::FlushTimeout(timeout)) => {
                info!("Flush not picked up within {:?}; its audio follows later", timeout);
            }
            Err(e) => return Err(e.into()),
        }
    }

    tokio::time::sleep(total.saturating_sub(started.elapsed())).await;
    if let Some(wav) = controller.stop_recording().await? {
        buffers.push(summarize(&wav)?);
    }

    let summary = Summary {
        buffers,
        session: controller.stats(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for (i, buffer) in summary.buffers.iter().enumerate() {
            info!(
                "Buffer {}: {} bytes, {} frames, {:.2}s, {}ch @ {}Hz, peak {}",
                i,
                buffer.bytes,
                buffer.frames,
                buffer.duration_secs,
                buffer.channels,
                buffer.sample_rate,
                buffer.peak
            );
        }
        info!(
            "Session {}: {} buffers, {} bytes, {} frames appended, {} dropped",
            summary.session.session_id.as_deref().unwrap_or("-"),
            summary.session.buffers_returned,
            summary.session.bytes_returned,
            summary.session.engine.frames_appended,
            summary.session.engine.frames_dropped
        );
    }

    Ok(())
}
