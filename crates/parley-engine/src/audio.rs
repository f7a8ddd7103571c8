use crate::config::ReplyTexts;
use crate::outcome::ResponseOutcome;
use parley_agent::{CompletionRequest, GenerationSettings, LlmBackend};
use parley_channels::ReplySink;
use parley_core::ParleyResult;
use parley_voice::{AudioFormat, AudioTranscoder, ScratchDir, SpeechSynthesizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Answers with a single voice note.
///
/// `GENERATING` (one batch call) → `SYNTHESIZING` → `TRANSCODING` →
/// `SENT`, `EMPTY` or `FAILED`. All intermediate audio lives in a per-request
/// [`ScratchDir`] that is gone before [`respond`](Self::respond) returns.
pub struct AudioResponder {
    backend: Arc<dyn LlmBackend>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transcoder: Arc<dyn AudioTranscoder>,
    settings: GenerationSettings,
    format: AudioFormat,
    scratch_root: Option<PathBuf>,
    texts: ReplyTexts,
}

impl AudioResponder {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcoder: Arc<dyn AudioTranscoder>,
        settings: GenerationSettings,
        texts: ReplyTexts,
    ) -> Self {
        Self {
            backend,
            synthesizer,
            transcoder,
            settings,
            format: AudioFormat::OggOpus,
            scratch_root: None,
            texts,
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    pub async fn respond(&self, prompt: &str, sink: &dyn ReplySink) -> ResponseOutcome {
        if let Err(e) = sink.send_typing().await {
            tracing::debug!(error = %e, "Typing indicator failed");
        }

        let request = CompletionRequest::new(prompt, &self.settings);
        let text = match self.backend.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, stage = "generating", "Voice reply failed");
                self.fallback(sink, &self.texts.voice_failure).await;
                return ResponseOutcome::Failed;
            }
        };

        if text.is_empty() {
            tracing::warn!("Empty generation");
            self.fallback(sink, &self.texts.no_comment).await;
            return ResponseOutcome::Empty;
        }

        let scratch = match ScratchDir::create(self.scratch_root.as_deref()) {
            Ok(scratch) => scratch,
            Err(e) => {
                tracing::error!(error = %e, stage = "scratch", "Voice reply failed");
                self.fallback(sink, &self.texts.voice_failure).await;
                return ResponseOutcome::Failed;
            }
        };

        let delivered = self.speak(&text, scratch.path(), sink).await;
        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "Could not remove scratch directory");
        }

        match delivered {
            Ok(()) => ResponseOutcome::Completed(text),
            Err(e) => {
                tracing::error!(error = %e, "Voice reply failed");
                self.fallback(sink, &self.texts.voice_failure).await;
                ResponseOutcome::Failed
            }
        }
    }

    async fn speak(&self, text: &str, scratch: &Path, sink: &dyn ReplySink) -> ParleyResult<()> {
        tracing::debug!(provider = self.synthesizer.provider_name(), "Synthesizing");
        let raw = self.synthesizer.synthesize(text, scratch).await?;

        tracing::debug!(format = self.format.extension(), "Transcoding");
        let audio = self.transcoder.transcode(&raw, self.format).await?;

        sink.send_voice(&audio.path, audio.duration).await?;
        tracing::info!(duration_secs = audio.duration_secs(), "Voice reply sent");
        Ok(())
    }

    async fn fallback(&self, sink: &dyn ReplySink, text: &str) {
        if let Err(e) = sink.send_text(text).await {
            tracing::error!(error = %e, "Could not send fallback text");
        }
    }
}
