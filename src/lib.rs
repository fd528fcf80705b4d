pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    ChannelBackend, Quantization, ToneBackend, WavBuffer,
};
pub use config::Config;
pub use engine::{AccumulationBuffer, CaptureEngine, Command, EngineStats, Response};
pub use error::RecorderError;
pub use session::{Controller, ControllerConfig, RecorderState, SessionStats};
