use parley_agent::{GenerationSettings, DEFAULT_PERSONA};
use parley_session::DEFAULT_HISTORY_LIMIT;
use parley_voice::AudioFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Startup configuration for [`SessionEngine`](crate::SessionEngine).
///
/// Built by the binary from its config file; the engine never reads the
/// environment itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Persona text opening every prompt.
    pub persona: String,
    /// Name the bot introduces itself with.
    pub bot_name: String,
    /// Maximum characters of history kept per user.
    pub history_limit: usize,
    /// Generation limits for streamed text replies.
    pub text_mode: GenerationSettings,
    /// Generation limits for voice replies.
    pub voice_mode: GenerationSettings,
    /// In-flight inbound events handled at once.
    pub concurrency_limit: usize,
    /// Run one generation at a time across all users.
    pub serialize_inference: bool,
    /// Container voice replies are delivered in.
    pub audio_format: AudioFormat,
    /// Parent of the per-request scratch directories. System temp dir if unset.
    pub scratch_root: Option<PathBuf>,
    pub replies: ReplyTexts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            bot_name: "Alex".to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            text_mode: GenerationSettings::text_default(),
            voice_mode: GenerationSettings::voice_default(),
            concurrency_limit: 4,
            serialize_inference: true,
            audio_format: AudioFormat::OggOpus,
            scratch_root: None,
            replies: ReplyTexts::default(),
        }
    }
}

/// Fixed user-facing texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyTexts {
    /// Sent immediately, then edited as fragments arrive.
    pub placeholder: String,
    /// A streamed generation produced nothing.
    pub went_blank: String,
    /// Any backend failure on the text path.
    pub failure: String,
    /// A voice generation produced nothing.
    pub no_comment: String,
    /// Any failure on the voice path.
    pub voice_failure: String,
    /// Answer to inbound voice notes.
    pub voice_note: String,
    /// `{mode}` is replaced by the selected mode's label.
    pub mode_selected: String,
    /// `{name}` and `{bot}` are replaced by the sender and bot names.
    pub greeting: String,
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self {
            placeholder: "...".to_string(),
            went_blank: "Sorry, I went blank. Try something else".to_string(),
            failure: "Sorry, something went wrong :(".to_string(),
            no_comment: "No comment".to_string(),
            voice_failure: "Sorry, I couldn't record a voice reply :(".to_string(),
            voice_note: "I can't listen to voice messages yet".to_string(),
            mode_selected: "{mode} replies it is".to_string(),
            greeting: "Hello {name}. I am {bot}. Ask me anything".to_string(),
        }
    }
}

impl ReplyTexts {
    pub fn greeting_for(&self, name: &str, bot: &str) -> String {
        self.greeting.replace("{name}", name).replace("{bot}", bot)
    }

    pub fn mode_selected_for(&self, mode_label: &str) -> String {
        self.mode_selected.replace("{mode}", mode_label)
    }
}
