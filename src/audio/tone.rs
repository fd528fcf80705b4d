// Synthetic audio backend: a sine tone (or silence) rendered in real time
//
// Stands in for a live capture device. One render quantum is emitted per
// quantum period, paced by a tokio interval, and pushed with `try_send` the
// way a host render callback would: the source never waits on the consumer.

use anyhow::{bail, Result};
use std::f32::consts::TAU;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

/// Sine tone backend
pub struct ToneBackend {
    config: AudioBackendConfig,
    frequency_hz: f32,
    amplitude: f32,
    task: Option<JoinHandle<()>>,
}

impl ToneBackend {
    pub fn new(config: AudioBackendConfig, frequency_hz: f32, amplitude: f32) -> Result<Self> {
        if config.sample_rate == 0 {
            bail!("Tone backend requires a non-zero sample rate");
        }
        if config.channels == 0 || config.quantum_frames == 0 {
            bail!(
                "Tone backend requires at least one channel and one frame per quantum \
                 (got {}ch, {} frames)",
                config.channels,
                config.quantum_frames
            );
        }

        info!(
            "Tone backend initialized ({}Hz, {} channels, {:.1}Hz tone at {:.2})",
            config.sample_rate, config.channels, frequency_hz, amplitude
        );

        Ok(Self {
            config,
            frequency_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
            task: None,
        })
    }

    fn quantum_period(&self) -> Duration {
        Duration::from_secs_f64(self.config.quantum_frames as f64 / self.config.sample_rate as f64)
    }
}

#[async_trait::async_trait]
impl AudioBackend for ToneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));

        let mut oscillator = Oscillator {
            phase: 0.0,
            step: TAU * self.frequency_hz / self.config.sample_rate as f32,
            amplitude: self.amplitude,
        };
        let channels = self.config.channels as usize;
        let quantum_frames = self.config.quantum_frames;
        let sample_rate = self.config.sample_rate as u64;
        let period = self.quantum_period();

        info!("Starting tone capture (quantum period {:?})", period);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            let mut rendered_frames: u64 = 0;
            let mut overruns: u64 = 0;

            loop {
                ticker.tick().await;

                let chunk = oscillator.render(quantum_frames);
                let frame = AudioFrame::new(
                    vec![chunk; channels],
                    rendered_frames * 1000 / sample_rate,
                );
                rendered_frames += quantum_frames as u64;

                match tx.try_send(frame) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        overruns += 1;
                        debug!("Frame queue full, dropped quantum ({} overruns)", overruns);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }

            if overruns > 0 {
                warn!("Tone capture dropped {} quanta on a full queue", overruns);
            }
            info!("Tone capture task stopped");
        });

        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        info!("Stopping tone capture");
        task.abort();
        // Cancellation is the expected outcome here
        let _ = task.await;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn name(&self) -> &str {
        "tone"
    }
}

struct Oscillator {
    phase: f32,
    step: f32,
    amplitude: f32,
}

impl Oscillator {
    fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut chunk = Vec::with_capacity(frames);
        for _ in 0..frames {
            chunk.push(self.phase.sin() * self.amplitude);
            self.phase = (self.phase + self.step) % TAU;
        }
        chunk
    }
}
