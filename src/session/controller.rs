use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::ControllerConfig;
use super::state::RecorderState;
use super::stats::SessionStats;
use crate::audio::{AudioBackend, WavBuffer};
use crate::engine::{CaptureEngine, Command, EngineCounters, EngineHandle, Response};
use crate::error::{RecorderError, Result};

/// Control-context handle to one recording lifecycle
///
/// Talks to the capture engine only through its command and response
/// channels; the accumulation buffer is never touched from here.
pub struct Controller {
    config: ControllerConfig,
    source: Option<Box<dyn AudioBackend>>,
    state: RecorderState,
    session: Option<Session>,
}

struct Session {
    id: String,
    started_at: DateTime<Utc>,
    counters: Arc<EngineCounters>,
    link: Option<EngineLink>,
    buffers_returned: usize,
    bytes_returned: usize,
}

/// Live channel pair to a running engine
struct EngineLink {
    commands: mpsc::Sender<Command>,
    responses: mpsc::Receiver<Response>,
    commands_sent: u64,
    engine: EngineHandle,
    /// Audio from flushes that were answered after their caller gave up
    late: Option<WavBuffer>,
}

/// How often a pending flush re-checks the engine's progress counters
const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(2);

impl EngineLink {
    /// Send a command, returning the sequence number the engine will tag it with
    async fn send(&mut self, command: Command) -> Result<u64> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RecorderError::EngineDisconnected)?;
        self.commands_sent += 1;
        Ok(self.commands_sent)
    }

    /// Keep a response nobody is waiting for, so its audio reaches the next caller
    fn stash(&mut self, response: Response) {
        let sequence = response.sequence();
        let wav = response.into_wav();
        debug!(
            "Holding late buffer for command #{} ({} frames)",
            sequence,
            wav.frame_count()
        );

        self.late = Some(match self.late.take() {
            Some(earlier) => match earlier.concat(wav) {
                Ok(joined) => joined,
                Err((earlier, wav)) => {
                    warn!(
                        "Late buffer format changed ({}ch @ {}Hz -> {}ch @ {}Hz)",
                        earlier.channels(),
                        earlier.sample_rate(),
                        wav.channels(),
                        wav.sample_rate()
                    );
                    wav
                }
            },
            None => wav,
        });
    }

    /// Prepend any late audio to `wav`
    fn with_late(&mut self, wav: Option<WavBuffer>) -> Option<WavBuffer> {
        match (self.late.take(), wav) {
            (Some(late), Some(wav)) => match late.concat(wav) {
                Ok(joined) => Some(joined),
                Err((late, wav)) => {
                    warn!(
                        "Dropping {} late frames that no longer match the stream format",
                        late.frame_count()
                    );
                    Some(wav)
                }
            },
            (late, wav) => wav.or(late),
        }
    }

    /// Stash every response already queued
    fn drain_queued(&mut self) {
        while let Ok(response) = self.responses.try_recv() {
            self.stash(response);
        }
    }

    /// Wait for the response to flush `sequence`
    ///
    /// Resolves to `None` as soon as the engine reports that flush as empty.
    /// `timeout` bounds only the wait for the engine to pick the command up;
    /// once it has, the encode is awaited to completion.
    async fn flush_response(
        &mut self,
        sequence: u64,
        counters: &EngineCounters,
        timeout: Duration,
    ) -> Result<Option<WavBuffer>> {
        let deadline = Instant::now() + timeout;
        let mut poll = tokio::time::interval(FLUSH_POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                response = self.responses.recv() => match response {
                    Some(response) if response.sequence() == sequence => {
                        return Ok(self.with_late(Some(response.into_wav())));
                    }
                    Some(response) => self.stash(response),
                    None => return Err(RecorderError::EngineDisconnected),
                },

                _ = poll.tick() => {
                    if counters.empty_flush_sequence() == sequence {
                        self.drain_queued();
                        return Ok(self.late.take());
                    }
                    if counters.accepted_sequence() < sequence && Instant::now() >= deadline {
                        return Err(RecorderError::FlushTimeout(timeout));
                    }
                }
            }
        }
    }

    /// Wait for the final response, collecting everything the engine still emits
    ///
    /// Ends when the engine closes the response channel on shutdown.
    async fn final_response(&mut self, sequence: u64) -> Option<WavBuffer> {
        let mut own = None;
        while let Some(response) = self.responses.recv().await {
            if response.sequence() == sequence {
                own = Some(response.into_wav());
            } else {
                self.stash(response);
            }
        }
        self.with_late(own)
    }
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            source: None,
            state: RecorderState::Uninitialized,
            session: None,
        }
    }

    /// Attach the live audio source the engine will be fed from
    pub fn with_source(mut self, source: Box<dyn AudioBackend>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.id.as_str())
    }

    /// Start the audio source and attach a fresh engine on its render thread
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state != RecorderState::Uninitialized {
            return Err(RecorderError::AlreadyInitialized(self.state.as_str()));
        }

        let sample_rate = match self.config.sample_rate {
            Some(rate) if rate > 0 => rate,
            _ => return Err(RecorderError::NotConfigured("sample rate")),
        };
        let source = self
            .source
            .as_mut()
            .ok_or(RecorderError::NotConfigured("audio source"))?;
        if source.sample_rate() != sample_rate {
            warn!(
                "Audio source {} renders at {}Hz but the recorder is set to {}Hz",
                source.name(),
                source.sample_rate(),
                sample_rate
            );
            return Err(RecorderError::NotConfigured("sample rate matching the audio source"));
        }

        let id = format!("session-{}", uuid::Uuid::new_v4());
        info!(
            "Initializing recorder {} ({}Hz, source: {})",
            id,
            sample_rate,
            source.name()
        );

        let frames = source.start().await.map_err(RecorderError::Source)?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_queue_capacity.max(1));
        let (response_tx, response_rx) = mpsc::channel(self.config.response_queue_capacity.max(1));

        let engine = CaptureEngine::new(sample_rate, self.config.quantization);
        let counters = engine.counters();

        let handle = match engine.spawn(frames, command_rx, response_tx) {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop_err) = source.stop().await {
                    warn!("Failed to stop audio source after spawn failure: {}", stop_err);
                }
                return Err(RecorderError::Spawn(e));
            }
        };

        self.session = Some(Session {
            id,
            started_at: Utc::now(),
            counters,
            link: Some(EngineLink {
                commands: command_tx,
                responses: response_rx,
                commands_sent: 0,
                engine: handle,
                late: None,
            }),
            buffers_returned: 0,
            bytes_returned: 0,
        });
        self.state = RecorderState::Initialized;

        info!("Recorder initialized");

        Ok(())
    }

    /// Signal the engine that capture has begun
    pub async fn start_recording(&mut self) -> Result<()> {
        let link = self.connected_link("start_recording")?;
        link.send(Command::Start).await?;

        if self.state != RecorderState::Recording {
            info!("Recording started");
        }
        self.state = RecorderState::Recording;

        Ok(())
    }

    /// Encode everything captured since the last flush; recording continues
    ///
    /// Returns `None` when nothing was buffered. Fails with `FlushTimeout` only
    /// if the engine does not pick the command up within the configured
    /// timeout; audio from such a flush is returned by the next flush or stop.
    pub async fn flush(&mut self) -> Result<Option<WavBuffer>> {
        let timeout = self.config.flush_timeout;
        let counters = self.session_counters();
        let link = self.recording_link("flush")?;

        let sequence = link.send(Command::Flush).await?;

        let wav = match link.flush_response(sequence, &counters, timeout).await {
            Ok(wav) => wav,
            Err(RecorderError::EngineDisconnected) => {
                error!("Capture engine went away during flush #{}", sequence);
                return Err(RecorderError::EngineDisconnected);
            }
            Err(e) => {
                warn!("Flush #{} not picked up within {:?}", sequence, timeout);
                return Err(e);
            }
        };

        if let Some(wav) = &wav {
            self.record_returned(wav);
        }
        Ok(wav)
    }

    /// Flush one last time, shut the engine down and disconnect the source
    ///
    /// Returns `None` when nothing was buffered since the previous flush.
    pub async fn stop_recording(&mut self) -> Result<Option<WavBuffer>> {
        let link = self.recording_link("stop_recording")?;

        info!("Stopping recording");

        let outcome = match link.send(Command::StopAndFlush).await {
            // The engine closes the response channel as it exits, so this
            // wait ends even when there was nothing to encode.
            Ok(sequence) => Ok(link.final_response(sequence).await),
            Err(e) => Err(e),
        };

        self.teardown().await;

        let wav = outcome?;
        if let Some(wav) = &wav {
            self.record_returned(wav);
        }

        info!("Recording stopped");

        Ok(wav)
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let Some(session) = &self.session else {
            return SessionStats {
                session_id: None,
                state: self.state,
                started_at: None,
                duration_secs: 0.0,
                buffers_returned: 0,
                bytes_returned: 0,
                engine: Default::default(),
            };
        };

        let duration = Utc::now().signed_duration_since(session.started_at);

        SessionStats {
            session_id: Some(session.id.clone()),
            state: self.state,
            started_at: Some(session.started_at),
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            buffers_returned: session.buffers_returned,
            bytes_returned: session.bytes_returned,
            engine: session.counters.snapshot(),
        }
    }

    fn session_counters(&self) -> Arc<EngineCounters> {
        self.session
            .as_ref()
            .map(|session| Arc::clone(&session.counters))
            .unwrap_or_default()
    }

    fn connected_link(&mut self, operation: &'static str) -> Result<&mut EngineLink> {
        let state = self.state;
        if !state.is_connected() {
            return Err(RecorderError::NotInitialized {
                operation,
                state: state.as_str(),
            });
        }
        self.session
            .as_mut()
            .and_then(|session| session.link.as_mut())
            .ok_or(RecorderError::EngineDisconnected)
    }

    fn recording_link(&mut self, operation: &'static str) -> Result<&mut EngineLink> {
        if !self.state.is_recording() {
            return Err(RecorderError::NotInitialized {
                operation,
                state: self.state.as_str(),
            });
        }
        self.connected_link(operation)
    }

    fn record_returned(&mut self, wav: &WavBuffer) {
        if let Some(session) = &mut self.session {
            session.buffers_returned += 1;
            session.bytes_returned += wav.len();
        }
    }

    /// Disconnect the source, release the channels and join the render thread
    async fn teardown(&mut self) {
        if let Some(source) = self.source.as_mut() {
            if let Err(e) = source.stop().await {
                error!("Failed to stop audio source: {}", e);
            }
        }

        if let Some(link) = self.session.as_mut().and_then(|session| session.link.take()) {
            let EngineLink {
                commands,
                responses,
                engine,
                ..
            } = link;
            drop(commands);
            drop(responses);

            if let Err(e) = engine.join().await {
                error!("Render thread did not exit cleanly: {}", e);
            }
        }

        self.state = RecorderState::Disconnected;
    }
}
