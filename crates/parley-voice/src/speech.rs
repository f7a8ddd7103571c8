//! Text-to-speech synthesis.
//!
//! Synthesis is a blocking, whole-utterance operation: the backend receives the
//! complete reply text and writes one audio file into the caller's scratch
//! directory.

use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Converts text into an audio asset.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into a new file inside `scratch_dir` and return its
    /// path. Fails with `ParleyError::Synthesis`.
    async fn synthesize(&self, text: &str, scratch_dir: &Path) -> ParleyResult<PathBuf>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}

/// Settings for [`HttpSpeechSynthesizer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Speaking speed, clamped to 0.25..=4.0 when sent.
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8880".to_string()
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            voice: default_voice(),
            speed: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// OpenAI-compatible `/v1/audio/speech` client.
///
/// Works against OpenAI itself and local servers implementing the same route
/// (Kokoro-FastAPI, openedai-speech, LocalAI). Audio is requested as WAV so the
/// transcoder always starts from lossless input.
pub struct HttpSpeechSynthesizer {
    config: SpeechConfig,
    client: Client,
}

impl HttpSpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, client }
    }

    fn build_body(&self, text: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": self.config.voice,
            "response_format": "wav",
        });
        if let Some(speed) = self.config.speed {
            body["speed"] = serde_json::json!(speed.clamp(0.25, 4.0));
        }
        body
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, scratch_dir: &Path) -> ParleyResult<PathBuf> {
        let url = format!("{}/v1/audio/speech", self.config.base_url.trim_end_matches('/'));

        let mut request = self.client.post(&url).json(&self.build_body(text));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ParleyError::Synthesis(format!("speech request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ParleyError::Synthesis(format!(
                "speech API error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ParleyError::Synthesis(format!("reading speech audio failed: {e}")))?;
        if audio.is_empty() {
            return Err(ParleyError::Synthesis("speech API returned no audio".into()));
        }

        let path = scratch_dir.join(format!("speech-{}.wav", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| ParleyError::Synthesis(format!("writing {}: {e}", path.display())))?;

        tracing::info!(
            provider = self.provider_name(),
            chars = text.chars().count(),
            bytes = audio.len(),
            "Speech synthesized"
        );
        Ok(path)
    }

    fn provider_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn synth_for(server: &MockServer) -> HttpSpeechSynthesizer {
        HttpSpeechSynthesizer::new(SpeechConfig {
            base_url: server.uri(),
            speed: Some(9.0),
            ..SpeechConfig::default()
        })
    }

    #[test]
    fn speed_is_clamped() {
        let synth = HttpSpeechSynthesizer::new(SpeechConfig {
            speed: Some(9.0),
            ..SpeechConfig::default()
        });
        let body = synth.build_body("hi");
        assert_eq!(body["speed"], 4.0);
        assert_eq!(body["response_format"], "wav");
    }

    #[test]
    fn config_defaults_from_empty_toml() {
        let config: SpeechConfig = toml::from_str("").unwrap();
        assert_eq!(config.model, "tts-1");
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.timeout_secs, 120);
    }

    #[tokio::test]
    async fn writes_audio_into_scratch_dir() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .and(body_partial_json(serde_json::json!({"input": "ok", "voice": "alloy"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF....WAVE".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = synth_for(&server).synthesize("ok", dir.path()).await.unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "wav");
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF....WAVE");
    }

    #[tokio::test]
    async fn server_error_is_synthesis_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(ResponseTemplate::new(422).set_body_string("unknown voice"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = synth_for(&server).synthesize("ok", dir.path()).await.unwrap_err();
        assert!(matches!(err, ParleyError::Synthesis(_)));
        assert!(err.to_string().contains("unknown voice"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_audio_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = synth_for(&server).synthesize("ok", dir.path()).await.unwrap_err();
        assert!(matches!(err, ParleyError::Synthesis(_)));
    }
}
