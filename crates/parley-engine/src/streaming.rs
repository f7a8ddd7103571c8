use crate::config::ReplyTexts;
use crate::outcome::ResponseOutcome;
use parley_agent::{CompletionRequest, GenerationSettings, LlmBackend, StreamEvent};
use parley_channels::{MessageHandle, ReplySink, UpdateOutcome};
use parley_core::{ParleyError, ParleyResult};
use std::sync::Arc;

/// Streams a generation into a single, continuously edited message.
///
/// `PENDING` (placeholder sent) → `STREAMING` (each fragment appended and the
/// whole accumulation pushed as an edit) → `DONE`, `EMPTY` or `FAILED`.
/// Rejected edits are logged and skipped; they never end the stream.
pub struct StreamingResponder {
    backend: Arc<dyn LlmBackend>,
    settings: GenerationSettings,
    texts: ReplyTexts,
}

impl StreamingResponder {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: GenerationSettings, texts: ReplyTexts) -> Self {
        Self {
            backend,
            settings,
            texts,
        }
    }

    pub async fn respond(&self, prompt: &str, sink: &dyn ReplySink) -> ResponseOutcome {
        let handle = match sink.send_placeholder(&self.texts.placeholder).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "Could not send placeholder");
                return ResponseOutcome::Failed;
            }
        };
        if let Err(e) = sink.send_typing().await {
            tracing::debug!(error = %e, "Typing indicator failed");
        }

        match self.stream_into(prompt, sink, &handle).await {
            Ok(text) if text.is_empty() => {
                tracing::warn!("Empty generation");
                push(sink, &handle, &self.texts.went_blank).await;
                ResponseOutcome::Empty
            }
            Ok(text) => ResponseOutcome::Completed(text),
            Err(e) => {
                tracing::error!(error = %e, "Streaming generation failed");
                push(sink, &handle, &self.texts.failure).await;
                ResponseOutcome::Failed
            }
        }
    }

    /// Runs the `STREAMING` state. Returns the accumulated text, with the
    /// placeholder showing all of it.
    async fn stream_into(
        &self,
        prompt: &str,
        sink: &dyn ReplySink,
        handle: &MessageHandle,
    ) -> ParleyResult<String> {
        let request = CompletionRequest::new(prompt, &self.settings);
        let (mut rx, task) = self.backend.complete_stream(&request).await?;

        let mut accumulated = String::new();
        let mut fragments = 0usize;
        let mut last_push_applied = true;
        let mut stream_error = None;

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::TextDelta { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    fragments += 1;
                    accumulated.push_str(&text);
                    last_push_applied = push(sink, handle, &accumulated).await;
                }
                StreamEvent::Done => break,
                StreamEvent::Error { message } => {
                    stream_error = Some(message);
                    break;
                }
            }
        }
        drop(rx);

        let finished = task
            .await
            .map_err(|e| ParleyError::Inference(format!("generation task failed: {e}")))
            .and_then(|r| r);
        if let Some(message) = stream_error {
            return Err(ParleyError::Inference(message));
        }
        finished?;

        if !accumulated.is_empty() && !last_push_applied {
            push(sink, handle, &accumulated).await;
        }
        tracing::info!(fragments, chars = accumulated.chars().count(), "Stream finished");
        Ok(accumulated)
    }
}

/// Edits the placeholder, swallowing rejections. Returns whether it applied.
async fn push(sink: &dyn ReplySink, handle: &MessageHandle, text: &str) -> bool {
    match sink.update_message(handle, text).await {
        UpdateOutcome::Applied => true,
        UpdateOutcome::Rejected { reason } => {
            tracing::debug!(message_id = handle.message_id, %reason, "Message update rejected");
            false
        }
    }
}
