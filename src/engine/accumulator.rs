use crate::audio::wav::{self, Quantization, WavBuffer};
use crate::audio::AudioFrame;

/// What happened to a frame offered to the accumulation buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Samples were copied into the per-channel planes
    Appended,
    /// The frame carried no samples
    Empty,
    /// The frame's channel count disagrees with the one fixed for the session
    ChannelMismatch { expected: u16, actual: usize },
}

/// Per-channel sample arena owned by the capture engine
///
/// Each channel is one contiguous plane; a tick's chunk is appended to the
/// end of its plane. Clearing resets lengths and keeps the allocations, so a
/// long session settles into a steady state without reallocating.
#[derive(Debug)]
pub struct AccumulationBuffer {
    sample_rate: u32,
    channels: Option<u16>,
    planes: Vec<Vec<f32>>,
    chunks: usize,
}

impl AccumulationBuffer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: None,
            planes: Vec::new(),
            chunks: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count adopted from the first non-empty frame, if any yet
    pub fn channels(&self) -> Option<u16> {
        self.channels
    }

    /// Chunks (ticks) appended since the last clear
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Frames held by the shortest channel
    pub fn frame_count(&self) -> usize {
        self.planes.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    pub fn append(&mut self, frame: &AudioFrame) -> AppendOutcome {
        if frame.is_empty() {
            return AppendOutcome::Empty;
        }

        let channels = match self.channels {
            Some(channels) if channels as usize == frame.channel_count() => channels,
            Some(expected) => {
                return AppendOutcome::ChannelMismatch {
                    expected,
                    actual: frame.channel_count(),
                }
            }
            None => {
                let Ok(channels) = u16::try_from(frame.channel_count()) else {
                    return AppendOutcome::ChannelMismatch {
                        expected: u16::MAX,
                        actual: frame.channel_count(),
                    };
                };
                self.channels = Some(channels);
                self.planes = vec![Vec::new(); channels as usize];
                channels
            }
        };

        for (plane, chunk) in self.planes.iter_mut().zip(&frame.channels) {
            plane.extend_from_slice(chunk);
        }
        debug_assert_eq!(self.planes.len(), channels as usize);
        self.chunks += 1;

        AppendOutcome::Appended
    }

    /// Encode everything buffered so far without clearing it
    pub fn encode(&self, quantization: Quantization) -> WavBuffer {
        wav::encode(
            &self.planes,
            self.sample_rate,
            self.channels.unwrap_or(0),
            quantization,
        )
    }

    /// Encode and clear, or `None` when nothing is buffered
    pub fn take_encoded(&mut self, quantization: Quantization) -> Option<WavBuffer> {
        if self.is_empty() {
            return None;
        }
        let wav = self.encode(quantization);
        self.clear();
        Some(wav)
    }

    /// Drop buffered samples; the channel count and plane capacity are kept
    pub fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.clear();
        }
        self.chunks = 0;
    }
}
