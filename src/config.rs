use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::{AudioBackendConfig, AudioSource, Quantization};
use crate::session::ControllerConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub controller: ControllerSettings,
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub render_quantum_frames: usize,
    pub frame_queue_capacity: usize,
    pub quantization: Quantization,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            render_quantum_frames: 128,
            frame_queue_capacity: 64,
            quantization: Quantization::Round,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub flush_timeout_ms: u64,
    pub command_queue_capacity: usize,
    pub response_queue_capacity: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            flush_timeout_ms: 2000,
            command_queue_capacity: 8,
            response_queue_capacity: 4,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// "tone" or "silence"
    pub kind: String,
    pub channels: u16,
    pub frequency_hz: f32,
    pub amplitude: f32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "tone".to_string(),
            channels: 1,
            frequency_hz: 440.0,
            amplitude: 0.5,
        }
    }
}

impl Config {
    /// Load from a config file (extension optional) with `WAVE_RECORDER__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("WAVE_RECORDER").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            sample_rate: Some(self.engine.sample_rate),
            flush_timeout: Duration::from_millis(self.controller.flush_timeout_ms),
            command_queue_capacity: self.controller.command_queue_capacity,
            response_queue_capacity: self.controller.response_queue_capacity,
            quantization: self.engine.quantization,
        }
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            sample_rate: self.engine.sample_rate,
            channels: self.source.channels,
            quantum_frames: self.engine.render_quantum_frames,
            queue_capacity: self.engine.frame_queue_capacity,
        }
    }

    pub fn audio_source(&self) -> Result<AudioSource> {
        match self.source.kind.as_str() {
            "tone" => Ok(AudioSource::Tone {
                frequency_hz: self.source.frequency_hz,
                amplitude: self.source.amplitude,
            }),
            "silence" => Ok(AudioSource::Silence),
            other => bail!("Unknown audio source kind: {}", other),
        }
    }
}
