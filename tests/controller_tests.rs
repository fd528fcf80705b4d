// Integration tests for the recording controller
//
// These tests run the full command/response protocol against an engine on
// its render thread, feeding frames through a channel backend.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use wave_recorder::audio::{
    AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource, WavBuffer,
};
use wave_recorder::{Controller, ControllerConfig, RecorderError, RecorderState};

const QUANTUM: usize = 128;

fn test_config() -> ControllerConfig {
    ControllerConfig {
        sample_rate: Some(48000),
        flush_timeout: Duration::from_millis(200),
        ..ControllerConfig::default()
    }
}

fn channel_controller(config: ControllerConfig) -> (Controller, mpsc::Sender<AudioFrame>) {
    let (source, tx) = AudioBackendFactory::channel(AudioBackendConfig::default());
    (Controller::new(config).with_source(source), tx)
}

async fn push(
    tx: &mpsc::Sender<AudioFrame>,
    frames: usize,
    channels: usize,
    value: f32,
) -> Result<()> {
    for i in 0..frames {
        tx.send(AudioFrame::new(vec![vec![value; QUANTUM]; channels], i as u64))
            .await?;
    }
    Ok(())
}

fn expect_wav(wav: Option<WavBuffer>) -> Result<WavBuffer> {
    wav.ok_or_else(|| anyhow::anyhow!("expected an encoded buffer"))
}

#[tokio::test]
async fn test_initialize_without_source_is_not_configured() {
    let mut controller = Controller::new(test_config());

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, RecorderError::NotConfigured("audio source")));
    assert_eq!(controller.state(), RecorderState::Uninitialized);
}

#[tokio::test]
async fn test_initialize_without_sample_rate_is_not_configured() {
    let config = ControllerConfig {
        sample_rate: None,
        ..test_config()
    };
    let (mut controller, _tx) = channel_controller(config);

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, RecorderError::NotConfigured("sample rate")));
}

#[tokio::test]
async fn test_initialize_rejects_source_at_another_rate() {
    let backend_config = AudioBackendConfig {
        sample_rate: 16000,
        ..AudioBackendConfig::default()
    };
    let (source, _tx) = AudioBackendFactory::channel(backend_config);
    let mut controller = Controller::new(test_config()).with_source(source);

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, RecorderError::NotConfigured(_)));
    assert_eq!(controller.state(), RecorderState::Uninitialized);
}

#[tokio::test]
async fn test_operations_before_initialize_are_rejected() {
    let (mut controller, _tx) = channel_controller(test_config());

    assert!(matches!(
        controller.start_recording().await,
        Err(RecorderError::NotInitialized { .. })
    ));
    assert!(matches!(
        controller.flush().await,
        Err(RecorderError::NotInitialized { .. })
    ));
    assert!(matches!(
        controller.stop_recording().await,
        Err(RecorderError::NotInitialized { .. })
    ));
}

#[tokio::test]
async fn test_flush_requires_recording() -> Result<()> {
    let (mut controller, _tx) = channel_controller(test_config());
    controller.initialize().await?;
    assert_eq!(controller.state(), RecorderState::Initialized);

    let err = controller.flush().await.unwrap_err();
    assert!(matches!(
        err,
        RecorderError::NotInitialized {
            operation: "flush",
            state: "initialized"
        }
    ));

    Ok(())
}

#[tokio::test]
async fn test_initialize_twice_is_rejected() -> Result<()> {
    let (mut controller, _tx) = channel_controller(test_config());
    controller.initialize().await?;

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, RecorderError::AlreadyInitialized("initialized")));

    Ok(())
}

#[tokio::test]
async fn test_flush_returns_wav_and_keeps_recording() -> Result<()> {
    let (mut controller, tx) = channel_controller(test_config());
    controller.initialize().await?;
    controller.start_recording().await?;
    assert_eq!(controller.state(), RecorderState::Recording);
    assert!(controller.session_id().is_some_and(|id| id.starts_with("session-")));

    push(&tx, 3, 1, 0.0).await?;
    let wav = expect_wav(controller.flush().await?)?;

    assert_eq!(wav.data_len(), 768);
    assert_eq!(u32::from_le_bytes(wav.as_bytes()[4..8].try_into()?), 804);
    assert_eq!(controller.state(), RecorderState::Recording);

    let audio = AudioFile::from_wav_bytes(wav.as_bytes())?;
    assert_eq!(audio.sample_rate, 48000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.frame_count(), 3 * QUANTUM);
    assert!((wav.duration_secs() - 0.008).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn test_flush_with_nothing_buffered_returns_none() -> Result<()> {
    let config = ControllerConfig {
        flush_timeout: Duration::from_secs(30),
        ..test_config()
    };
    let (mut controller, tx) = channel_controller(config);
    controller.initialize().await?;
    controller.start_recording().await?;

    // Resolves as soon as the engine reports the flush empty, not at the timeout
    let wav = tokio::time::timeout(Duration::from_secs(5), controller.flush()).await??;
    assert!(wav.is_none());
    assert_eq!(controller.state(), RecorderState::Recording);

    // The controller is still usable afterwards
    push(&tx, 2, 1, 0.5).await?;
    let wav = expect_wav(controller.flush().await?)?;
    assert_eq!(wav.frame_count(), 2 * QUANTUM);

    let stats = controller.stats();
    assert_eq!(stats.engine.empty_flushes, 1);
    assert_eq!(stats.engine.flushes_encoded, 1);

    Ok(())
}

#[tokio::test]
async fn test_slow_encode_outlasting_timeout_still_returns_audio() -> Result<()> {
    const SAMPLES: usize = 8_000_000;

    let config = ControllerConfig {
        flush_timeout: Duration::from_millis(50),
        ..test_config()
    };
    let (mut controller, tx) = channel_controller(config);
    controller.initialize().await?;
    controller.start_recording().await?;

    tx.send(AudioFrame::new(vec![vec![0.25; SAMPLES]], 0)).await?;
    while controller.stats().engine.frames_appended < 1 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // Encoding this many samples takes longer than the timeout; the flush
    // waits for it because the engine has already picked the command up.
    let wav = expect_wav(controller.flush().await?)?;
    assert_eq!(wav.frame_count(), SAMPLES);
    assert_eq!(controller.stats().buffers_returned, 1);

    Ok(())
}

#[tokio::test]
async fn test_audio_from_timed_out_flush_reaches_next_result() -> Result<()> {
    const SAMPLES: usize = 2_000_000;
    const FRAMES: usize = 4;

    let config = ControllerConfig {
        flush_timeout: Duration::from_millis(1),
        ..test_config()
    };
    let (mut controller, tx) = channel_controller(config);
    controller.initialize().await?;
    controller.start_recording().await?;

    // The engine is busy appending these when the flush arrives, so the
    // flush may time out before it is picked up.
    for i in 0..FRAMES {
        tx.send(AudioFrame::new(vec![vec![-0.5; SAMPLES]], i as u64)).await?;
    }

    let mut returned = 0;
    match controller.flush().await {
        Ok(wav) => returned += expect_wav(wav)?.frame_count(),
        Err(RecorderError::FlushTimeout(timeout)) => {
            assert_eq!(timeout, Duration::from_millis(1));
        }
        Err(e) => return Err(e.into()),
    }

    push(&tx, 1, 1, -0.5).await?;
    let wav = controller.stop_recording().await?.expect("final buffer");
    returned += wav.frame_count();

    // Nothing captured is lost, whichever call carried it
    assert_eq!(returned, FRAMES * SAMPLES + QUANTUM);
    let audio = AudioFile::from_wav_bytes(wav.as_bytes())?;
    assert_eq!(audio.frame_count(), wav.frame_count());
    assert!(audio.samples.iter().all(|&s| s == -16384));

    Ok(())
}

#[tokio::test]
async fn test_stop_after_flush_cycles_returns_only_latest_frames() -> Result<()> {
    let (mut controller, tx) = channel_controller(test_config());
    controller.initialize().await?;
    controller.start_recording().await?;

    for cycle in 1..=5 {
        push(&tx, cycle, 2, 0.1 * cycle as f32).await?;
        let wav = expect_wav(controller.flush().await?)?;
        assert_eq!(wav.frame_count(), cycle * QUANTUM, "flush cycle {}", cycle);
    }

    push(&tx, 4, 2, -0.25).await?;
    let wav = controller.stop_recording().await?.expect("final buffer");

    let audio = AudioFile::from_wav_bytes(wav.as_bytes())?;
    assert_eq!(audio.frame_count(), 4 * QUANTUM);
    assert!(audio.samples.iter().all(|&s| s == -8192));
    assert_eq!(controller.state(), RecorderState::Disconnected);

    let stats = controller.stats();
    assert_eq!(stats.buffers_returned, 6);
    assert_eq!(stats.engine.frames_appended, 15 + 4);
    assert!(stats.engine.terminated);

    Ok(())
}

#[tokio::test]
async fn test_stop_with_nothing_buffered_returns_none() -> Result<()> {
    let (mut controller, _tx) = channel_controller(test_config());
    controller.initialize().await?;
    controller.start_recording().await?;

    let wav = tokio::time::timeout(Duration::from_secs(2), controller.stop_recording()).await??;
    assert!(wav.is_none());
    assert_eq!(controller.state(), RecorderState::Disconnected);

    Ok(())
}

#[tokio::test]
async fn test_stop_disconnects_source_and_rejects_further_calls() -> Result<()> {
    let (mut controller, tx) = channel_controller(test_config());
    controller.initialize().await?;
    controller.start_recording().await?;

    push(&tx, 1, 1, 0.0).await?;
    controller.stop_recording().await?;

    assert!(tx.is_closed(), "engine should release the frame feed");
    assert!(matches!(
        controller.flush().await,
        Err(RecorderError::NotInitialized { .. })
    ));
    assert!(matches!(
        controller.start_recording().await,
        Err(RecorderError::NotInitialized { .. })
    ));
    assert!(matches!(
        controller.initialize().await,
        Err(RecorderError::AlreadyInitialized("disconnected"))
    ));

    Ok(())
}

#[tokio::test]
async fn test_mismatched_channel_frames_do_not_change_header() -> Result<()> {
    let (mut controller, tx) = channel_controller(test_config());
    controller.initialize().await?;
    controller.start_recording().await?;

    push(&tx, 2, 2, 0.0).await?;
    push(&tx, 3, 1, 0.0).await?;
    push(&tx, 1, 2, 0.0).await?;

    let wav = expect_wav(controller.flush().await?)?;
    assert_eq!(wav.channels(), 2);
    assert_eq!(wav.frame_count(), 3 * QUANTUM);
    assert_eq!(controller.stats().engine.frames_dropped, 3);

    Ok(())
}

#[tokio::test]
async fn test_truncate_quantization_reaches_encoder() -> Result<()> {
    let config = ControllerConfig {
        quantization: wave_recorder::Quantization::Truncate,
        ..test_config()
    };
    let (mut controller, tx) = channel_controller(config);
    controller.initialize().await?;
    controller.start_recording().await?;

    push(&tx, 1, 1, 0.5).await?;
    let wav = expect_wav(controller.flush().await?)?;
    let audio = AudioFile::from_wav_bytes(wav.as_bytes())?;
    assert!(audio.samples.iter().all(|&s| s == 16383));

    Ok(())
}

#[tokio::test]
async fn test_tone_source_end_to_end() -> Result<()> {
    let backend_config = AudioBackendConfig {
        sample_rate: 8000,
        channels: 2,
        quantum_frames: 80, // 10ms quanta
        queue_capacity: 256,
    };
    let source = AudioBackendFactory::create(
        AudioSource::Tone {
            frequency_hz: 440.0,
            amplitude: 0.5,
        },
        backend_config,
    )?;

    let config = ControllerConfig {
        sample_rate: Some(8000),
        flush_timeout: Duration::from_secs(1),
        ..ControllerConfig::default()
    };
    let mut controller = Controller::new(config).with_source(source);
    controller.initialize().await?;
    controller.start_recording().await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let wav = controller.stop_recording().await?.expect("tone buffer");

    let audio = AudioFile::from_wav_bytes(wav.as_bytes())?;
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.sample_rate, 8000);
    assert!(audio.frame_count() > 0);
    assert_eq!(audio.frame_count() % 80, 0);
    assert!(audio.samples.iter().all(|&s| s.abs() <= 16384));

    Ok(())
}
