//! Capture/encode engine
//!
//! This module provides the real-time half of a recording:
//! - Per-channel accumulation of render quanta
//! - The command/response protocol spoken with the controller
//! - On-demand PCM16 WAV encoding, handed back by move
//! - Diagnostic counters shared with the control context

mod accumulator;
mod engine;
mod protocol;
mod stats;

pub use accumulator::{AccumulationBuffer, AppendOutcome};
pub use engine::{CaptureEngine, EngineHandle, RENDER_THREAD_NAME};
pub use protocol::{Command, Response};
pub use stats::{EngineCounters, EngineStats};
