use serde::{Deserialize, Serialize};
use std::path::Path;

/// Audio container formats the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Uncompressed PCM, what synthesizers hand back.
    Wav,
    /// Opus in an Ogg container; required for Telegram voice notes.
    #[default]
    OggOpus,
    Mp3,
}

impl AudioFormat {
    /// Get the file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::OggOpus => "ogg",
            Self::Mp3 => "mp3",
        }
    }

    /// Get the MIME type for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::OggOpus => "audio/ogg",
            Self::Mp3 => "audio/mpeg",
        }
    }

    /// Recognizes a file by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wav" => Some(Self::Wav),
            "ogg" | "oga" | "opus" => Some(Self::OggOpus),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    /// `ffmpeg` encoder arguments producing this format.
    pub(crate) fn ffmpeg_codec_args(self) -> &'static [&'static str] {
        match self {
            Self::Wav => &["-c:a", "pcm_s16le"],
            Self::OggOpus => &["-c:a", "libopus", "-b:a", "32k", "-f", "ogg"],
            Self::Mp3 => &["-c:a", "libmp3lame", "-q:a", "4"],
        }
    }
}
