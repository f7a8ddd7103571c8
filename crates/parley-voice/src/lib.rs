//! Voice-reply collaborators: turning text into a deliverable audio asset.
//!
//! # Main types
//!
//! - [`SpeechSynthesizer`] — Text to audio asset in a scratch directory.
//! - [`HttpSpeechSynthesizer`] — OpenAI-compatible `/v1/audio/speech` client.
//! - [`AudioTranscoder`] — Container conversion plus duration measurement.
//! - [`FfmpegTranscoder`] — `ffmpeg`/`ffprobe` implementation.
//! - [`ScratchDir`] — Per-request temporary directory removed on drop.

/// Audio container formats.
pub mod format;
/// Per-request scratch storage.
pub mod scratch;
/// Speech synthesis backends.
pub mod speech;
/// Audio transcoding backends.
pub mod transcode;

pub use format::AudioFormat;
pub use scratch::ScratchDir;
pub use speech::{HttpSpeechSynthesizer, SpeechConfig, SpeechSynthesizer};
pub use transcode::{AudioTranscoder, FfmpegTranscoder, TranscodedAudio, TranscoderConfig};
