pub mod backend;
pub mod channel;
pub mod file;
pub mod tone;
pub mod wav;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use channel::ChannelBackend;
pub use file::AudioFile;
pub use tone::ToneBackend;
pub use wav::{encode, generate_wav_header, Quantization, WavBuffer, WAV_HEADER_SIZE};
