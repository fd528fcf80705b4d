//! PCM16 WAV encoding.
//!
//! Produces a canonical 44-byte RIFF/WAVE header followed by interleaved
//! little-endian signed 16-bit samples.
//!
//! Layout:
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    36 + data_size
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * 2
//! [32-33]  block_align = channels * 2
//! [34-35]  16
//! [36-39]  "data"
//! [40-43]  data_size
//! ```

use serde::{Deserialize, Serialize};

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bits per encoded sample.
pub const BITS_PER_SAMPLE: u16 = 16;

const BYTES_PER_SAMPLE: usize = (BITS_PER_SAMPLE / 8) as usize;

/// How a clamped float sample is scaled onto the int16 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    /// `round(x * 32767)`, halves rounded away from zero.
    #[default]
    Round,
    /// `trunc(x * 32767)`, toward zero. Bit-compatible with recorders that
    /// store the scaled float straight into an int16 slot.
    Truncate,
}

impl Quantization {
    /// Clamp to `[-1.0, 1.0]` and scale to a signed 16-bit sample. NaN maps to 0.
    pub fn quantize(self, sample: f32) -> i16 {
        if sample.is_nan() {
            return 0;
        }
        let scaled = sample.clamp(-1.0, 1.0) * i16::MAX as f32;
        match self {
            Quantization::Round => scaled.round() as i16,
            Quantization::Truncate => scaled.trunc() as i16,
        }
    }
}

/// One complete RIFF/WAVE container. Immutable once encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavBuffer {
    bytes: Vec<u8>,
    sample_rate: u32,
    channels: u16,
    frame_count: usize,
}

impl WavBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames (one sample per channel) in the data chunk.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Size of the `data` chunk payload in bytes.
    pub fn data_len(&self) -> usize {
        self.bytes.len() - WAV_HEADER_SIZE
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Append `next`'s audio after this buffer's, rewriting the header.
    ///
    /// Returns `Err((self, next))` when the formats differ or the combined
    /// data chunk would not fit the 32-bit RIFF size field.
    pub fn concat(mut self, next: WavBuffer) -> Result<WavBuffer, (WavBuffer, WavBuffer)> {
        if self.sample_rate != next.sample_rate || self.channels != next.channels {
            return Err((self, next));
        }
        let data_size = self.data_len() + next.data_len();
        if data_size > u32::MAX as usize - 36 {
            return Err((self, next));
        }

        self.bytes.reserve_exact(next.data_len());
        self.bytes.extend_from_slice(&next.bytes[WAV_HEADER_SIZE..]);
        let header = generate_wav_header(self.sample_rate, self.channels, data_size as u32);
        self.bytes[..WAV_HEADER_SIZE].copy_from_slice(&header);
        self.frame_count += next.frame_count;
        Ok(self)
    }
}

impl AsRef<[u8]> for WavBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<WavBuffer> for Vec<u8> {
    fn from(wav: WavBuffer) -> Self {
        wav.bytes
    }
}

/// Generate the 44-byte header for `data_size` bytes of PCM16 audio.
pub fn generate_wav_header(
    sample_rate: u32,
    channels: u16,
    data_size: u32,
) -> [u8; WAV_HEADER_SIZE] {
    let block_align = channels.wrapping_mul(BYTES_PER_SAMPLE as u16);
    let byte_rate = sample_rate.wrapping_mul(block_align as u32);
    let chunk_size = 36u32.wrapping_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Encode planar float channels into an interleaved PCM16 WAV buffer.
///
/// The first `channels` entries of `planes` are used. Channels of unequal
/// length are cut to the shortest one, and the frame count is further capped
/// so the data chunk size fits the 32-bit RIFF field. The output is sized
/// exactly up front, so encoding performs a single allocation.
pub fn encode<P: AsRef<[f32]>>(
    planes: &[P],
    sample_rate: u32,
    channels: u16,
    quantization: Quantization,
) -> WavBuffer {
    let planes: Vec<&[f32]> = planes
        .iter()
        .take(channels as usize)
        .map(|plane| plane.as_ref())
        .collect();

    let block_align = channels as usize * BYTES_PER_SAMPLE;
    let max_frames = if block_align == 0 {
        0
    } else {
        (u32::MAX as usize - 36) / block_align
    };

    let frame_count = if planes.len() < channels as usize {
        0
    } else {
        planes
            .iter()
            .map(|plane| plane.len())
            .min()
            .unwrap_or(0)
            .min(max_frames)
    };

    let data_size = frame_count * block_align;

    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + data_size);
    bytes.extend_from_slice(&generate_wav_header(sample_rate, channels, data_size as u32));

    for frame in 0..frame_count {
        for plane in &planes {
            bytes.extend_from_slice(&quantization.quantize(plane[frame]).to_le_bytes());
        }
    }

    WavBuffer {
        bytes,
        sample_rate,
        channels,
        frame_count,
    }
}
