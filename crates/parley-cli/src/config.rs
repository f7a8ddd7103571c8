use parley_agent::ModelConfig;
use parley_core::{ParleyError, ParleyResult};
use parley_engine::EngineConfig;
use parley_voice::{SpeechConfig, TranscoderConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

const REDACTED: &str = "***";

/// Everything the binary needs, as read from `parley.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub telegram: TelegramConfig,
    pub model: ModelConfig,
    pub engine: EngineConfig,
    pub speech: SpeechConfig,
    pub transcoder: TranscoderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Numeric user ids or usernames. Empty admits everybody.
    pub allowed_users: Vec<String>,
    /// Alternative Bot API server.
    pub api_base: Option<String>,
    pub event_buffer: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: Vec::new(),
            api_base: None,
            event_buffer: 64,
        }
    }
}

impl ParleyConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub async fn load(path: &Path) -> ParleyResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => toml::from_str(&text).map_err(|e| {
                ParleyError::Config(format!("invalid config file '{}': {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ParleyError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))),
        }
    }

    /// Applies deployment overrides. Unset or blank variables leave the file's
    /// value alone.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(list) = var("ALLOWED_USERS") {
            self.telegram.allowed_users = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(url) = var("MODEL_URL") {
            self.model.api_base_url = Some(url);
        }
        if let Some(key) = var("MODEL_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = var("TTS_URL") {
            self.speech.base_url = url;
        }
        if let Some(key) = var("TTS_API_KEY") {
            self.speech.api_key = Some(key);
        }
    }

    /// Checks the settings a running bot cannot do without.
    pub fn validate(&self) -> ParleyResult<()> {
        if self.bot_token().is_none() {
            return Err(ParleyError::Config(
                "BOT_TOKEN is not set (environment or [telegram].bot_token)".into(),
            ));
        }
        if self.engine.concurrency_limit == 0 {
            return Err(ParleyError::Config(
                "engine.concurrency_limit must be at least 1".into(),
            ));
        }
        if self.engine.history_limit == 0 {
            return Err(ParleyError::Config(
                "engine.history_limit must be at least 1".into(),
            ));
        }
        for (name, settings) in [
            ("text_mode", &self.engine.text_mode),
            ("voice_mode", &self.engine.voice_mode),
        ] {
            if settings.max_tokens == 0 {
                return Err(ParleyError::Config(format!(
                    "engine.{name}.max_tokens must be at least 1"
                )));
            }
        }
        if self.telegram.event_buffer == 0 {
            return Err(ParleyError::Config(
                "telegram.event_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn bot_token(&self) -> Option<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    /// A copy safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let hide = |secret: &mut Option<String>| {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        };
        hide(&mut copy.telegram.bot_token);
        hide(&mut copy.model.api_key);
        hide(&mut copy.speech.api_key);
        copy
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: ParleyConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.history_limit, 256);
        assert_eq!(config.engine.concurrency_limit, 4);
        assert_eq!(config.telegram.event_buffer, 64);
        assert_eq!(config.model.top_p, 1.0);
        assert!(config.telegram.allowed_users.is_empty());
    }

    #[test]
    fn full_file_parses() {
        let config: ParleyConfig = toml::from_str(
            r#"
            [telegram]
            allowed_users = ["12345", "alice"]

            [model]
            provider = "ollama"
            model_id = "llama3"
            gpu_layers = 35

            [engine]
            persona = "You are a pirate."
            history_limit = 500

            [engine.voice_mode]
            max_tokens = 300

            [speech]
            voice = "nova"

            [transcoder]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.allowed_users, vec!["12345", "alice"]);
        assert_eq!(config.model.gpu_layers, Some(35));
        assert_eq!(config.engine.persona, "You are a pirate.");
        assert_eq!(config.engine.history_limit, 500);
        assert_eq!(config.engine.voice_mode.max_tokens, 300);
        assert_eq!(config.engine.voice_mode.stop, vec!["\n".to_string()]);
        assert_eq!(config.engine.text_mode.max_tokens, 100);
        assert_eq!(config.speech.voice, "nova");
        assert_eq!(
            config.transcoder.ffmpeg_path,
            std::path::PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.transcoder.ffprobe_path, std::path::PathBuf::from("ffprobe"));
    }

    #[test]
    fn voice_format_is_an_engine_setting() {
        let config: ParleyConfig = toml::from_str("[engine]\naudio_format = \"mp3\"\n").unwrap();
        assert_eq!(config.engine.audio_format, parley_voice::AudioFormat::Mp3);

        let stale = toml::from_str::<ParleyConfig>("[transcoder]\nformat = \"mp3\"\n");
        assert!(stale.is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = ParleyConfig::default();
        config.telegram.allowed_users = vec!["old".into()];
        config.apply_env(env(&[
            ("BOT_TOKEN", "123:abc"),
            ("ALLOWED_USERS", " 42, bob ,"),
            ("MODEL_URL", "http://gpu:8080"),
            ("TTS_URL", "http://tts:8880"),
            ("TTS_API_KEY", ""),
        ]));
        assert_eq!(config.bot_token(), Some("123:abc"));
        assert_eq!(config.telegram.allowed_users, vec!["42", "bob"]);
        assert_eq!(config.model.api_base_url.as_deref(), Some("http://gpu:8080"));
        assert_eq!(config.speech.base_url, "http://tts:8880");
        assert!(config.speech.api_key.is_none());
    }

    #[test]
    fn missing_token_fails_validation() {
        let config = ParleyConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));

        let mut config = ParleyConfig::default();
        config.apply_env(env(&[("BOT_TOKEN", "t")]));
        config.validate().unwrap();

        config.engine.concurrency_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn redaction_hides_secrets_only() {
        let mut config = ParleyConfig::default();
        config.apply_env(env(&[("BOT_TOKEN", "secret"), ("MODEL_API_KEY", "sk-1")]));
        let shown = config.redacted();
        assert_eq!(shown.telegram.bot_token.as_deref(), Some(REDACTED));
        assert_eq!(shown.model.api_key.as_deref(), Some(REDACTED));
        assert!(shown.speech.api_key.is_none());
        assert_eq!(config.bot_token(), Some("secret"));
    }

    #[tokio::test]
    async fn load_reads_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.toml");

        let config = ParleyConfig::load(&path).await.unwrap();
        assert_eq!(config.engine.bot_name, "Alex");

        std::fs::write(&path, "[engine]\nbot_name = \"Robo\"\n").unwrap();
        let config = ParleyConfig::load(&path).await.unwrap();
        assert_eq!(config.engine.bot_name, "Robo");

        std::fs::write(&path, "[engine\n").unwrap();
        assert!(ParleyConfig::load(&path).await.is_err());
    }
}
