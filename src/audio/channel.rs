// Host-fed audio backend
//
// The host's render callback (or a test) owns the sending half and pushes one
// frame per tick; the engine receives from the other half.

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::info;

use super::backend::{AudioBackend, AudioFrame};

pub struct ChannelBackend {
    rx: Option<mpsc::Receiver<AudioFrame>>,
    sample_rate: u32,
    capturing: bool,
}

impl ChannelBackend {
    /// Create a backend and the sender the host pushes frames into
    pub fn new(capacity: usize, sample_rate: u32) -> (Self, mpsc::Sender<AudioFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                rx: Some(rx),
                sample_rate,
                capturing: false,
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl AudioBackend for ChannelBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let Some(rx) = self.rx.take() else {
            bail!("Channel backend can only be started once");
        };

        info!("Channel backend started");
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.capturing {
            info!("Channel backend stopped");
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        "channel"
    }
}
