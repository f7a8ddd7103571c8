pub mod completions;

use crate::config::{GenerationSettings, ModelConfig};
use crate::stream::StreamEvent;
use async_trait::async_trait;
use parley_core::ParleyResult;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The receiving half of a streaming generation plus the task producing it.
///
/// The join handle resolves to the full generated text, or to the error that
/// ended the stream.
pub type StreamHandle = (mpsc::Receiver<StreamEvent>, JoinHandle<ParleyResult<String>>);

/// One generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, settings: &GenerationSettings) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: settings.max_tokens,
            stop: settings.stop.clone(),
        }
    }
}

/// Trait for text-generation backends.
///
/// Every backend fault surfaces as `ParleyError::Inference`, whether it
/// happens before the first fragment or in the middle of a stream.
///
/// To add a new backend:
/// 1. Create a new module in `backends/`
/// 2. Implement `LlmBackend` for your struct
/// 3. Add the variant to `LlmProvider` in `config.rs`
/// 4. Wire it up in [`build_backend`]
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Non-streaming completion returning the whole text.
    async fn complete(&self, request: &CompletionRequest) -> ParleyResult<String>;

    /// Streaming completion.
    async fn complete_stream(&self, request: &CompletionRequest) -> ParleyResult<StreamHandle>;
}

/// Creates the backend named by `config.provider`.
pub fn build_backend(config: ModelConfig) -> Box<dyn LlmBackend> {
    // Every supported server speaks the OpenAI completions dialect.
    Box::new(completions::CompletionsBackend::new(config))
}
