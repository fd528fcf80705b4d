use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::RecorderState;
use crate::engine::EngineStats;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier, absent before `initialize`
    pub session_id: Option<String>,

    /// Current lifecycle state
    pub state: RecorderState,

    /// When the engine was attached
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since `started_at`
    pub duration_secs: f64,

    /// Encoded buffers handed back to the caller
    pub buffers_returned: usize,

    /// Total bytes across those buffers
    pub bytes_returned: usize,

    /// Engine-side counters
    pub engine: EngineStats,
}
