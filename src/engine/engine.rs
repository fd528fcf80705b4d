use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::accumulator::{AccumulationBuffer, AppendOutcome};
use super::protocol::{Command, Response};
use super::stats::EngineCounters;
use crate::audio::{AudioFrame, Quantization};
use crate::error::RecorderError;

/// Name of the dedicated render thread
pub const RENDER_THREAD_NAME: &str = "capture-render";

/// Capture/encode engine
///
/// Owns the accumulation buffer outright; the controller only ever sees
/// encoded buffers moved out through the response channel.
pub struct CaptureEngine {
    buffer: AccumulationBuffer,
    quantization: Quantization,
    counters: Arc<EngineCounters>,
    commands_received: u64,
    started: bool,
    terminated: bool,
}

impl CaptureEngine {
    pub fn new(sample_rate: u32, quantization: Quantization) -> Self {
        Self {
            buffer: AccumulationBuffer::new(sample_rate),
            quantization,
            counters: Arc::new(EngineCounters::default()),
            commands_received: 0,
            started: false,
            terminated: false,
        }
    }

    /// Shared handle to the diagnostic counters
    pub fn counters(&self) -> Arc<EngineCounters> {
        Arc::clone(&self.counters)
    }

    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    pub fn channels(&self) -> Option<u16> {
        self.buffer.channels()
    }

    /// Chunks buffered since the last flush
    pub fn buffered_chunks(&self) -> usize {
        self.buffer.chunk_count()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Absorb one render quantum. Never encodes.
    pub fn on_frame(&mut self, frame: &AudioFrame) {
        if self.terminated {
            return;
        }

        match self.buffer.append(frame) {
            AppendOutcome::Appended => self.counters.frame_appended(),
            AppendOutcome::Empty => self.counters.empty_frame(),
            AppendOutcome::ChannelMismatch { expected, actual } => {
                let dropped = self.counters.frame_dropped();
                if dropped == 1 {
                    warn!(
                        "Frame channel count mismatch: expected {}, got {}. Dropping frame.",
                        expected, actual
                    );
                } else {
                    debug!(
                        "Dropped {}-channel frame at {}ms ({} dropped so far)",
                        actual, frame.timestamp_ms, dropped
                    );
                }
            }
        }
    }

    /// Apply one command, returning the response to send back, if any
    pub fn on_command(&mut self, command: Command) -> Option<Response> {
        if self.terminated {
            debug!("Ignoring {:?} after shutdown", command);
            return None;
        }

        self.commands_received += 1;
        let sequence = self.commands_received;
        self.counters.command_accepted(sequence);

        match command {
            Command::Start => {
                self.started = true;
                info!("Capture started (command #{})", sequence);
                None
            }
            Command::Flush => self.flush(sequence),
            Command::StopAndFlush => {
                let response = self.flush(sequence);
                self.terminated = true;
                self.counters.mark_terminated();
                info!("Capture engine stopped (command #{})", sequence);
                response
            }
        }
    }

    fn flush(&mut self, sequence: u64) -> Option<Response> {
        let chunks = self.buffer.chunk_count();
        match self.buffer.take_encoded(self.quantization) {
            Some(wav) => {
                self.counters.flush_encoded();
                info!(
                    "Flush #{}: encoded {} chunks into {} frames ({} bytes, {}ch @ {}Hz)",
                    sequence,
                    chunks,
                    wav.frame_count(),
                    wav.len(),
                    wav.channels(),
                    wav.sample_rate()
                );
                Some(Response::Encoded { sequence, wav })
            }
            None => {
                self.counters.empty_flush(sequence);
                debug!("Flush #{}: nothing buffered", sequence);
                None
            }
        }
    }

    /// Serve frames and commands until stopped or the controller goes away
    ///
    /// Frames and commands share this single loop. When a command arrives,
    /// every frame already queued is absorbed first, so a flush encodes
    /// exactly the frames delivered ahead of it.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<AudioFrame>,
        mut commands: mpsc::Receiver<Command>,
        responses: mpsc::Sender<Response>,
    ) {
        info!("Capture engine running at {}Hz", self.sample_rate());

        let mut frames_open = true;

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else {
                        info!("Command channel closed, shutting down capture engine");
                        break;
                    };

                    if frames_open {
                        while let Ok(frame) = frames.try_recv() {
                            self.on_frame(&frame);
                        }
                    }

                    if let Some(response) = self.on_command(command) {
                        if responses.send(response).await.is_err() {
                            error!(
                                "Controller dropped the response channel; encoded buffer discarded"
                            );
                        }
                    }

                    if self.terminated {
                        break;
                    }
                }

                frame = frames.recv(), if frames_open => match frame {
                    Some(frame) => self.on_frame(&frame),
                    None => {
                        info!("Audio source closed; waiting for commands");
                        frames_open = false;
                    }
                },
            }
        }

        self.counters.mark_terminated();
        // Dropping the receivers here disconnects the source and closes the
        // response channel behind the last encoded buffer.
    }

    /// Run the engine on a dedicated render thread with its own single-threaded runtime
    pub fn spawn(
        self,
        frames: mpsc::Receiver<AudioFrame>,
        commands: mpsc::Receiver<Command>,
        responses: mpsc::Sender<Response>,
    ) -> std::io::Result<EngineHandle> {
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;

        let thread = thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(self.run(frames, commands, responses)))?;

        Ok(EngineHandle { thread })
    }
}

/// Join handle for an engine running on its render thread
#[derive(Debug)]
pub struct EngineHandle {
    thread: thread::JoinHandle<()>,
}

impl EngineHandle {
    /// Wait for the render thread to exit without blocking the caller's runtime
    pub async fn join(self) -> Result<(), RecorderError> {
        let joined = tokio::task::spawn_blocking(move || self.thread.join())
            .await
            .map_err(|e| RecorderError::EnginePanicked(e.to_string()))?;

        joined.map_err(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "render thread panicked".to_string());
            RecorderError::EnginePanicked(message)
        })
    }
}
