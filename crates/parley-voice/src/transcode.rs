//! Audio container conversion and duration measurement.

use crate::format::AudioFormat;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A converted asset ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodedAudio {
    pub path: PathBuf,
    /// Measured on the converted file, not the synthesizer's output.
    pub duration: Duration,
}

impl TranscodedAudio {
    /// Duration rounded up to whole seconds, as voice-note metadata expects.
    pub fn duration_secs(&self) -> u32 {
        let secs = self.duration.as_secs_f64().ceil();
        if secs >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            secs as u32
        }
    }
}

/// Converts an audio asset to a delivery format and measures it.
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Replace `source` with a `format` encoded sibling and return it together
    /// with its duration. Fails with `ParleyError::Transcode`.
    async fn transcode(&self, source: &Path, format: AudioFormat) -> ParleyResult<TranscodedAudio>;
}

/// Where the conversion tools live. The target format is chosen per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscoderConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: PathBuf,
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
        }
    }
}

/// Transcoder shelling out to `ffmpeg` and `ffprobe`.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Checks that both binaries can be executed.
    pub async fn probe_installation(&self) -> ParleyResult<()> {
        for bin in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let output = tokio::process::Command::new(bin)
                .arg("-version")
                .output()
                .await
                .map_err(|e| {
                    ParleyError::Transcode(format!("cannot run '{}': {e}", bin.display()))
                })?;
            if !output.status.success() {
                return Err(ParleyError::Transcode(format!(
                    "'{} -version' exited with {}",
                    bin.display(),
                    output.status
                )));
            }
        }
        Ok(())
    }

    async fn convert(&self, source: &Path, target: &Path, format: AudioFormat) -> ParleyResult<()> {
        let mut cmd = tokio::process::Command::new(&self.config.ffmpeg_path);
        cmd.args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(source)
            .args(format.ffmpeg_codec_args())
            .arg(target);

        let output = cmd.output().await.map_err(|e| {
            ParleyError::Transcode(format!(
                "failed to run '{}': {e}",
                self.config.ffmpeg_path.display()
            ))
        })?;

        if !output.status.success() {
            return Err(ParleyError::Transcode(format!(
                "ffmpeg failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn measure(&self, path: &Path) -> ParleyResult<Duration> {
        let output = tokio::process::Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                ParleyError::Transcode(format!(
                    "failed to run '{}': {e}",
                    self.config.ffprobe_path.display()
                ))
            })?;

        if !output.status.success() {
            return Err(ParleyError::Transcode(format!(
                "ffprobe failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn transcode(&self, source: &Path, format: AudioFormat) -> ParleyResult<TranscodedAudio> {
        let target = transcode_target(source, format);
        self.convert(source, &target, format).await?;

        if target != source {
            if let Err(e) = tokio::fs::remove_file(source).await {
                tracing::warn!(path = %source.display(), error = %e, "Could not remove source audio");
            }
        }

        let duration = self.measure(&target).await?;
        tracing::debug!(
            path = %target.display(),
            duration_ms = duration.as_millis() as u64,
            "Audio transcoded"
        );
        Ok(TranscodedAudio {
            path: target,
            duration,
        })
    }
}

/// The sibling path the converted file is written to. Converting into the
/// source's own format gets a distinct name since ffmpeg cannot overwrite its
/// input in place.
fn transcode_target(source: &Path, format: AudioFormat) -> PathBuf {
    let target = source.with_extension(format.extension());
    if target == source {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        source.with_file_name(format!("{stem}.out.{}", format.extension()))
    } else {
        target
    }
}

fn parse_probe_duration(stdout: &str) -> ParleyResult<Duration> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    let secs: f64 = line
        .parse()
        .map_err(|_| ParleyError::Transcode(format!("unparseable duration: '{line}'")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ParleyError::Transcode(format!("invalid duration: {secs}")));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn probe_output_parses() {
        assert_eq!(
            parse_probe_duration("3.480000\n").unwrap(),
            Duration::from_millis(3480)
        );
        assert_eq!(parse_probe_duration("\n 12\n").unwrap(), Duration::from_secs(12));
    }

    #[test]
    fn probe_garbage_is_transcode_error() {
        assert!(matches!(
            parse_probe_duration("N/A"),
            Err(ParleyError::Transcode(_))
        ));
        assert!(parse_probe_duration("").is_err());
        assert!(parse_probe_duration("-1").is_err());
    }

    #[test]
    fn duration_rounds_up_to_whole_seconds() {
        let audio = TranscodedAudio {
            path: PathBuf::from("a.ogg"),
            duration: Duration::from_millis(3480),
        };
        assert_eq!(audio.duration_secs(), 4);
        let exact = TranscodedAudio {
            duration: Duration::from_secs(2),
            ..audio
        };
        assert_eq!(exact.duration_secs(), 2);
    }

    #[test]
    fn target_is_sibling_with_new_extension() {
        let src = Path::new("/tmp/x/speech-1.wav");
        assert_eq!(
            transcode_target(src, AudioFormat::OggOpus),
            PathBuf::from("/tmp/x/speech-1.ogg")
        );
        assert_eq!(
            transcode_target(src, AudioFormat::Wav),
            PathBuf::from("/tmp/x/speech-1.out.wav")
        );
    }

    #[tokio::test]
    async fn missing_binary_is_transcode_error() {
        let transcoder = FfmpegTranscoder::new(TranscoderConfig {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg-parley-test"),
            ..TranscoderConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.wav");
        std::fs::write(&src, b"RIFF").unwrap();

        let err = transcoder
            .transcode(&src, AudioFormat::OggOpus)
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Transcode(_)));
        assert!(transcoder.probe_installation().await.is_err());
    }
}
