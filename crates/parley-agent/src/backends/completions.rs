use super::{CompletionRequest, LlmBackend, StreamHandle};
use crate::config::ModelConfig;
use crate::stream::StreamEvent;
use async_trait::async_trait;
use futures_util::StreamExt;
use parley_core::{ParleyError, ParleyResult};
use tokio::sync::mpsc;

/// OpenAI-compatible text completions backend.
///
/// Works with llama.cpp's `llama-server`, Ollama, vLLM and any other server
/// exposing `POST /v1/completions` with server-sent-event streaming.
pub struct CompletionsBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl CompletionsBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "prompt": request.prompt,
            "max_tokens": request.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "stream": stream,
        });

        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }
        if let Some(layers) = self.config.gpu_layers {
            body["n_gpu_layers"] = serde_json::json!(layers);
        }

        body
    }

    fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/completions", self.config.base_url());
        let request = self.http.post(url).json(body);
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LlmBackend for CompletionsBackend {
    async fn complete(&self, request: &CompletionRequest) -> ParleyResult<String> {
        let body = self.build_body(request, false);

        let resp = self
            .request(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Inference(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ParleyError::Inference(e.to_string()))?;

        if !status.is_success() {
            return Err(ParleyError::Inference(format!(
                "completions API error {status}: {resp_body}"
            )));
        }

        parse_completion_response(&resp_body)
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> ParleyResult<StreamHandle> {
        let body = self.build_body(request, true);

        let resp = self
            .request(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Inference(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ParleyError::Inference(format!(
                "completions API error {status}: {error_body}"
            )));
        }

        let (tx, rx) = mpsc::channel::<StreamEvent>(256);
        let byte_stream = resp.bytes_stream();

        let handle = tokio::spawn(async move {
            let mut stream = byte_stream;
            let mut lines = LineBuffer::default();
            let mut full_text = String::new();

            while let Some(chunk_result) = stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let message = format!("Stream read error: {e}");
                        let _ = tx
                            .send(StreamEvent::Error {
                                message: message.clone(),
                            })
                            .await;
                        return Err(ParleyError::Inference(message));
                    }
                };

                lines.extend(&chunk);

                while let Some(line) = lines.next_line() {
                    match parse_sse_line(&line) {
                        SseLine::Skip => {}
                        SseLine::Finished => {
                            let _ = tx.send(StreamEvent::Done).await;
                            return Ok(full_text);
                        }
                        SseLine::Fragment(text) => {
                            full_text.push_str(&text);
                            let _ = tx.send(StreamEvent::TextDelta { text }).await;
                        }
                        SseLine::Failed(message) => {
                            let _ = tx
                                .send(StreamEvent::Error {
                                    message: message.clone(),
                                })
                                .await;
                            return Err(ParleyError::Inference(message));
                        }
                    }
                }
            }

            let _ = tx.send(StreamEvent::Done).await;
            Ok(full_text)
        });

        Ok((rx, handle))
    }
}

/// Raw response bytes split into complete lines.
///
/// Decoding waits for the newline so a character split across two network
/// chunks is decoded whole.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Skip,
    Fragment(String),
    Finished,
    Failed(String),
}

/// Interprets one server-sent-event line of a streaming completion.
///
/// A chunk that carries a `finish_reason` ends the sequence and its text is
/// not treated as a fragment.
fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
        return SseLine::Skip;
    };
    if data == "[DONE]" {
        return SseLine::Finished;
    }

    let event: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(_) => return SseLine::Skip,
    };

    if let Some(error) = event.get("error") {
        let message = error["message"]
            .as_str()
            .map_or_else(|| error.to_string(), ToString::to_string);
        return SseLine::Failed(message);
    }

    let choice = &event["choices"][0];
    if choice["finish_reason"].as_str().is_some() {
        return SseLine::Finished;
    }

    match choice["text"].as_str() {
        Some(text) if !text.is_empty() => SseLine::Fragment(text.to_string()),
        _ => SseLine::Skip,
    }
}

pub fn parse_completion_response(body: &serde_json::Value) -> ParleyResult<String> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| ParleyError::Inference(format!("response has no choices: {body}")))?;
    Ok(choice["text"].as_str().unwrap_or_default().to_string())
}
