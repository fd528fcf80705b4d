use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the recording controller.
///
/// All of them are reported synchronously to the caller of the failing
/// operation; nothing is retried internally.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// A prerequisite for `initialize` is missing.
    #[error("recorder is not configured: {0}")]
    NotConfigured(&'static str),

    /// A recording operation was invoked in the wrong lifecycle state.
    #[error("recorder is not initialized for {operation} (state: {state})")]
    NotInitialized {
        operation: &'static str,
        state: &'static str,
    },

    #[error("recorder is already initialized (state: {0})")]
    AlreadyInitialized(&'static str),

    /// The engine did not pick up a flush command in time.
    #[error("capture engine did not pick up flush within {0:?}")]
    FlushTimeout(Duration),

    /// The engine shut down while a response was still expected.
    #[error("capture engine disconnected")]
    EngineDisconnected,

    #[error("capture engine panicked: {0}")]
    EnginePanicked(String),

    #[error("failed to spawn render thread")]
    Spawn(#[source] std::io::Error),

    /// The audio source failed to start or stop.
    #[error("audio source error")]
    Source(#[source] anyhow::Error),
}

pub type Result<T, E = RecorderError> = std::result::Result<T, E>;
