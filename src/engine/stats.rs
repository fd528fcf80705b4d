use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Diagnostic counters updated by the engine, readable from any context
#[derive(Debug, Default)]
pub struct EngineCounters {
    frames_appended: AtomicU64,
    frames_dropped: AtomicU64,
    empty_frames: AtomicU64,
    flushes_encoded: AtomicU64,
    empty_flushes: AtomicU64,
    accepted_sequence: AtomicU64,
    empty_flush_sequence: AtomicU64,
    terminated: AtomicBool,
}

impl EngineCounters {
    pub(crate) fn frame_appended(&self) {
        self.frames_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the drop count including this one
    pub(crate) fn frame_dropped(&self) -> u64 {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn empty_frame(&self) {
        self.empty_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flush_encoded(&self) {
        self.flushes_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn empty_flush(&self, sequence: u64) {
        self.empty_flushes.fetch_add(1, Ordering::Relaxed);
        self.empty_flush_sequence.store(sequence, Ordering::Release);
    }

    pub(crate) fn command_accepted(&self, sequence: u64) {
        self.accepted_sequence.store(sequence, Ordering::Release);
    }

    /// Sequence of the latest command the engine has begun handling (0 = none)
    pub fn accepted_sequence(&self) -> u64 {
        self.accepted_sequence.load(Ordering::Acquire)
    }

    /// Sequence of the latest flush that found nothing buffered (0 = none)
    pub fn empty_flush_sequence(&self) -> u64 {
        self.empty_flush_sequence.load(Ordering::Acquire)
    }

    pub(crate) fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> EngineStats {
        EngineStats {
            frames_appended: self.frames_appended.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
            flushes_encoded: self.flushes_encoded.load(Ordering::Relaxed),
            empty_flushes: self.empty_flushes.load(Ordering::Relaxed),
            terminated: self.terminated.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of the engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Frames copied into the accumulation buffer
    pub frames_appended: u64,

    /// Frames dropped because their channel count disagreed with the session's
    pub frames_dropped: u64,

    /// Frames that carried no samples
    pub empty_frames: u64,

    /// Flush or stop commands that produced an encoded buffer
    pub flushes_encoded: u64,

    /// Flush or stop commands that found nothing buffered
    pub empty_flushes: u64,

    /// Whether the engine has shut down
    pub terminated: bool,
}
