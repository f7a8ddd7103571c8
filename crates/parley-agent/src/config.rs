use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// llama.cpp `llama-server` (OpenAI-compatible completions endpoint).
    #[default]
    LlamaCpp,
    /// Ollama's OpenAI-compatible endpoint.
    Ollama,
    OpenAi,
}

/// Connection and sampling settings for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Layers to offload to the accelerator, forwarded as `n_gpu_layers`.
    #[serde(default)]
    pub gpu_layers: Option<u32>,
}

fn default_model_id() -> String {
    "default".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_top_p() -> f32 {
    1.0
}

impl ModelConfig {
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                LlmProvider::LlamaCpp => "http://127.0.0.1:8080",
                LlmProvider::Ollama => "http://127.0.0.1:11434",
                LlmProvider::OpenAi => "https://api.openai.com",
            }
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model_id: default_model_id(),
            api_key: None,
            api_base_url: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            gpu_layers: None,
        }
    }
}

/// Per-reply-mode generation limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,
}

fn default_stop() -> Vec<String> {
    vec!["\n".to_string()]
}

impl GenerationSettings {
    /// Short single-line answers, suited to live message edits.
    pub fn text_default() -> Self {
        Self {
            max_tokens: 100,
            stop: default_stop(),
        }
    }

    /// Longer answers for spoken replies.
    pub fn voice_default() -> Self {
        Self {
            max_tokens: 200,
            stop: default_stop(),
        }
    }
}
