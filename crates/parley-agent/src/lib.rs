//! Text generation for parley: prompt composition and the backends that turn a
//! prompt into text, either incrementally or in one batch.
//!
//! # Main types
//!
//! - [`PromptBuilder`] — Persona + history + question prompt composition.
//! - [`LlmBackend`] — Generation interface (streaming and batch).
//! - [`StreamEvent`] — One item of a streaming generation.
//! - [`CompletionsBackend`] — OpenAI-compatible `/v1/completions` client.
//! - [`SerializedBackend`] — Funnels every generation through one lock.

pub mod backends;
pub mod config;
pub mod prompt;
pub mod serialized;
pub mod stream;

pub use backends::completions::CompletionsBackend;
pub use backends::{build_backend, CompletionRequest, LlmBackend, StreamHandle};
pub use config::{GenerationSettings, LlmProvider, ModelConfig};
pub use prompt::{build_prompt, PromptBuilder, DEFAULT_PERSONA};
pub use serialized::SerializedBackend;
pub use stream::StreamEvent;
