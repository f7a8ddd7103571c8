use crate::audio::AudioResponder;
use crate::config::EngineConfig;
use crate::mode::ModeController;
use crate::outcome::ResponseOutcome;
use crate::streaming::StreamingResponder;
use parley_agent::{LlmBackend, PromptBuilder, SerializedBackend};
use parley_channels::{Channel, InboundEvent, InboundKind, ReplySink};
use parley_core::{ParleyResult, ReplyMode, UserId};
use parley_session::SessionStore;
use parley_voice::{AudioTranscoder, SpeechSynthesizer};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::Instrument;

/// Composition root: turns inbound events into replies and history.
///
/// Every text exchange runs under the user's turn lock, from reading the
/// history to appending the new exchange, so exchanges of one user are applied
/// in a single order. The exchange is recorded whatever the responder's
/// outcome; failed and empty replies record an empty output.
pub struct SessionEngine {
    config: EngineConfig,
    store: Arc<dyn SessionStore>,
    prompts: PromptBuilder,
    modes: ModeController,
    streaming: StreamingResponder,
    audio: AudioResponder,
}

impl SessionEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn LlmBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Self {
        let backend: Arc<dyn LlmBackend> = if config.serialize_inference {
            Arc::new(SerializedBackend::new(backend))
        } else {
            backend
        };

        let streaming = StreamingResponder::new(
            backend.clone(),
            config.text_mode.clone(),
            config.replies.clone(),
        );
        let audio = AudioResponder::new(
            backend,
            synthesizer,
            transcoder,
            config.voice_mode.clone(),
            config.replies.clone(),
        )
        .with_format(config.audio_format)
        .with_scratch_root(config.scratch_root.clone());

        Self {
            prompts: PromptBuilder::new(config.persona.clone()),
            modes: ModeController::new(store.clone()),
            store,
            streaming,
            audio,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    /// Handle one inbound event, replying through `sink`.
    ///
    /// Backend failures never surface here; an error means a plain transport
    /// send (greeting, menu, confirmation) failed.
    pub async fn handle(&self, event: InboundEvent, sink: &dyn ReplySink) -> ParleyResult<()> {
        let user = event.user_id;
        match event.kind {
            InboundKind::Text(input) => {
                self.converse(&user, &input, sink).await;
                Ok(())
            }
            InboundKind::Start | InboundKind::NewConversation => {
                self.store.clear_history(&user).await;
                tracing::info!(user_id = %user, "History cleared");
                let name = event.sender_name.as_deref().unwrap_or("there");
                sink.send_text(
                    &self
                        .config
                        .replies
                        .greeting_for(name, &self.config.bot_name),
                )
                .await
            }
            InboundKind::ModeMenu => {
                let current = self.modes.mode(&user).await;
                sink.send_mode_menu(current).await
            }
            InboundKind::SelectMode(mode) => {
                self.modes.set_mode(&user, mode).await;
                sink.send_text(&self.config.replies.mode_selected_for(mode.label()))
                    .await
            }
            InboundKind::Voice => sink.send_text(&self.config.replies.voice_note).await,
        }
    }

    /// Run one text exchange end to end and record it.
    pub async fn converse(&self, user: &UserId, input: &str, sink: &dyn ReplySink) -> ResponseOutcome {
        let _turn = self.store.begin_turn(user).await;

        let history = self.store.history(user).await;
        let mode = self.modes.mode(user).await;
        let prompt = self.prompts.build(&history, input);
        tracing::debug!(user_id = %user, %mode, %prompt, "Prompt built");

        let outcome = match mode {
            ReplyMode::Text => self.streaming.respond(&prompt, sink).await,
            ReplyMode::Voice => self.audio.respond(&prompt, sink).await,
        };

        self.store
            .append_exchange(user, input, outcome.history_output())
            .await;
        tracing::info!(
            user_id = %user,
            %mode,
            outcome = outcome.label(),
            response = outcome.history_output(),
            "Exchange finished"
        );
        outcome
    }

    /// Consume `events` until the sender side closes, handling at most
    /// `concurrency_limit` of them at a time. Returns once every spawned
    /// handler has finished.
    pub async fn serve(self: Arc<Self>, mut events: mpsc::Receiver<InboundEvent>, channel: Arc<dyn Channel>) {
        let limit = self.config.concurrency_limit.max(1);
        let permits = Arc::new(Semaphore::new(limit));
        tracing::info!(channel = channel.name(), concurrency_limit = limit, "Engine serving");

        while let Some(event) = events.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let engine = self.clone();
            let sink = channel.sink(&event.chat_id);
            let span = tracing::info_span!(
                "event",
                request_id = %uuid::Uuid::new_v4(),
                user_id = %event.user_id,
            );
            tokio::spawn(
                async move {
                    if let Err(e) = engine.handle(event, sink.as_ref()).await {
                        tracing::error!(error = %e, "Reply failed");
                    }
                    drop(permit);
                }
                .instrument(span),
            );
        }

        // Wait for in-flight handlers.
        let _ = permits.acquire_many(limit as u32).await;
        tracing::info!("Engine stopped");
    }
}
