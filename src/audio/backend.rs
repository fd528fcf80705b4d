use anyhow::Result;
use tokio::sync::mpsc;

use super::channel::ChannelBackend;
use super::tone::ToneBackend;

/// One render quantum of audio (32-bit float, planar)
#[derive(Debug, Clone, Default)]
pub struct AudioFrame {
    /// One sample chunk per channel, all covering the same render quantum
    pub channels: Vec<Vec<f32>>,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn new(channels: Vec<Vec<f32>>, timestamp_ms: u64) -> Self {
        Self {
            channels,
            timestamp_ms,
        }
    }

    /// Number of channels carried by this frame
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// A frame with no channels, or only zero-length chunks, carries no audio
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|chunk| chunk.is_empty())
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate the source renders at
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frames per render quantum (fixed by the host scheduler)
    pub quantum_frames: usize,
    /// Capacity of the bounded frame queue
    pub queue_capacity: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            quantum_frames: 128, // Web Audio render quantum
            queue_capacity: 64,
        }
    }
}

/// Live audio source feeding the capture engine
///
/// Implementations:
/// - Tone: synthetic sine/silence generator paced in real time
/// - Channel: frames pushed by a host render callback (or a test)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Sample rate the frames are rendered at
    fn sample_rate(&self) -> u32;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create a self-driven audio backend for the given source
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Tone {
                frequency_hz,
                amplitude,
            } => {
                let backend = ToneBackend::new(config, frequency_hz, amplitude)?;
                Ok(Box::new(backend))
            }

            AudioSource::Silence => {
                let backend = ToneBackend::new(config, 0.0, 0.0)?;
                Ok(Box::new(backend))
            }
        }
    }

    /// Create a backend fed by the caller, returning the sending half
    pub fn channel(
        config: AudioBackendConfig,
    ) -> (Box<dyn AudioBackend>, mpsc::Sender<AudioFrame>) {
        let (backend, tx) = ChannelBackend::new(config.queue_capacity, config.sample_rate);
        (Box::new(backend), tx)
    }
}

/// Audio source type
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Sine tone on every channel
    Tone { frequency_hz: f32, amplitude: f32 },
    /// Digital silence
    Silence,
}
