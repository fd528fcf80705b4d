use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::Quantization;

/// Configuration for a recording controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Sample rate the engine is bound to. Required by `initialize`.
    pub sample_rate: Option<u32>,

    /// How long `flush` waits for an encoded buffer before giving up.
    /// An empty buffer produces no response at all, so this bounds that wait.
    pub flush_timeout: Duration,

    /// Capacity of the controller -> engine command queue
    pub command_queue_capacity: usize,

    /// Capacity of the engine -> controller response queue
    pub response_queue_capacity: usize,

    /// Float to int16 scaling policy used by the encoder
    pub quantization: Quantization,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sample_rate: Some(48000),
            flush_timeout: Duration::from_secs(2),
            command_queue_capacity: 8,
            response_queue_capacity: 4,
            quantization: Quantization::Round,
        }
    }
}
