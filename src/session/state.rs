use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller lifecycle.
///
/// ```text
/// uninitialized -> initialized -> recording -> disconnected
///                                  |    ^
///                                  +----+ flush
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Uninitialized,
    Initialized,
    Recording,
    Disconnected,
}

impl RecorderState {
    pub fn as_str(self) -> &'static str {
        match self {
            RecorderState::Uninitialized => "uninitialized",
            RecorderState::Initialized => "initialized",
            RecorderState::Recording => "recording",
            RecorderState::Disconnected => "disconnected",
        }
    }

    /// Whether an engine is attached and accepting commands
    pub fn is_connected(self) -> bool {
        matches!(self, RecorderState::Initialized | RecorderState::Recording)
    }

    pub fn is_recording(self) -> bool {
        self == RecorderState::Recording
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
