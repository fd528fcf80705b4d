use crate::audio::WavBuffer;

/// Controller to engine. Commands carry no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Capture has begun. Buffering is unconditional, so this only marks the session.
    Start,
    /// Encode and hand back everything buffered, then keep recording
    Flush,
    /// Encode and hand back everything buffered, then shut the engine down
    StopAndFlush,
}

/// Engine to controller
#[derive(Debug)]
pub enum Response {
    /// Encoded buffer for the command with the given sequence number.
    /// Sequence numbers count commands received by the engine, starting at 1.
    Encoded { sequence: u64, wav: WavBuffer },
}

impl Response {
    pub fn sequence(&self) -> u64 {
        match self {
            Response::Encoded { sequence, .. } => *sequence,
        }
    }

    pub fn into_wav(self) -> WavBuffer {
        match self {
            Response::Encoded { wav, .. } => wav,
        }
    }
}
