use crate::backends::{CompletionRequest, LlmBackend, StreamHandle};
use crate::stream::StreamEvent;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// An `LlmBackend` that lets exactly one generation run at a time.
///
/// A single loaded model is usually not reentrant, so every batch call and
/// every stream (from its first fragment until its join handle resolves)
/// holds one shared lock. Callers queue in FIFO order on that lock; transport
/// and audio work outside the generation call stay parallel.
pub struct SerializedBackend {
    inner: Arc<dyn LlmBackend>,
    gate: Arc<Mutex<()>>,
}

impl SerializedBackend {
    pub fn new(inner: Arc<dyn LlmBackend>) -> Self {
        Self {
            inner,
            gate: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl LlmBackend for SerializedBackend {
    async fn complete(&self, request: &CompletionRequest) -> ParleyResult<String> {
        let _guard = self.gate.lock().await;
        self.inner.complete(request).await
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> ParleyResult<StreamHandle> {
        let guard = self.gate.clone().lock_owned().await;
        let (mut inner_rx, inner_handle) = self.inner.complete_stream(request).await?;

        let (tx, rx) = mpsc::channel::<StreamEvent>(256);
        let handle = tokio::spawn(async move {
            while let Some(event) = inner_rx.recv().await {
                if tx.send(event).await.is_err() {
                    tracing::debug!("Stream consumer went away, draining generation");
                    break;
                }
            }
            drop(inner_rx);
            let result = inner_handle
                .await
                .map_err(|e| ParleyError::Inference(format!("generation task failed: {e}")))
                .and_then(|r| r);
            drop(guard);
            result
        });

        Ok((rx, handle))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mock backend that records how many calls overlap.
    struct OverlapProbe {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl OverlapProbe {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }

        fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct SlowBackend {
        probe: Arc<OverlapProbe>,
    }

    #[async_trait]
    impl LlmBackend for SlowBackend {
        async fn complete(&self, request: &CompletionRequest) -> ParleyResult<String> {
            self.probe.enter();
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.probe.leave();
            Ok(format!("echo {}", request.prompt))
        }

        async fn complete_stream(&self, request: &CompletionRequest) -> ParleyResult<StreamHandle> {
            self.probe.enter();
            let probe = self.probe.clone();
            let prompt = request.prompt.clone();
            let (tx, rx) = mpsc::channel(4);
            let handle = tokio::spawn(async move {
                for word in prompt.split(' ') {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    let _ = tx
                        .send(StreamEvent::TextDelta {
                            text: word.to_string(),
                        })
                        .await;
                }
                let _ = tx.send(StreamEvent::Done).await;
                probe.leave();
                Ok(prompt)
            });
            Ok((rx, handle))
        }
    }

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.into(),
            max_tokens: 10,
            stop: vec![],
        }
    }

    #[tokio::test]
    async fn batch_calls_never_overlap() {
        let probe = Arc::new(OverlapProbe::new());
        let backend = Arc::new(SerializedBackend::new(Arc::new(SlowBackend {
            probe: probe.clone(),
        })));

        let mut handles = Vec::new();
        for i in 0..4 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend.complete(&request(&format!("p{i}"))).await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().unwrap().starts_with("echo p"));
        }
        assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn streams_hold_the_lock_until_finished() {
        let probe = Arc::new(OverlapProbe::new());
        let backend = Arc::new(SerializedBackend::new(Arc::new(SlowBackend {
            probe: probe.clone(),
        })));

        let mut handles = Vec::new();
        for prompt in ["a b c", "d e f"] {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                let (mut rx, handle) = backend.complete_stream(&request(prompt)).await.unwrap();
                let mut fragments = Vec::new();
                while let Some(event) = rx.recv().await {
                    if let StreamEvent::TextDelta { text } = event {
                        fragments.push(text);
                    }
                }
                (fragments, handle.await.unwrap().unwrap())
            }));
        }
        for h in handles {
            let (fragments, full) = h.await.unwrap();
            assert_eq!(fragments.len(), 3);
            assert_eq!(fragments.join(" "), full);
        }
        assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inner_error_releases_lock() {
        struct Broken;

        #[async_trait]
        impl LlmBackend for Broken {
            async fn complete(&self, _request: &CompletionRequest) -> ParleyResult<String> {
                Err(ParleyError::Inference("model not loaded".into()))
            }

            async fn complete_stream(
                &self,
                _request: &CompletionRequest,
            ) -> ParleyResult<StreamHandle> {
                Err(ParleyError::Inference("model not loaded".into()))
            }
        }

        let backend = SerializedBackend::new(Arc::new(Broken));
        assert!(backend.complete_stream(&request("x")).await.is_err());
        let second = tokio::time::timeout(Duration::from_secs(1), backend.complete(&request("y")))
            .await
            .expect("lock must be free after a failed stream start");
        assert!(second.is_err());
    }
}
