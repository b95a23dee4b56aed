//! LlmClient trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CompletionRequest, CompletionResponse, LlmError, StreamChunk};

/// Stateless LLM client - each call is independent
///
/// The service keeps no conversation between calls, so the caller sends the
/// whole transcript every time. A wake awaits each call before building the
/// next request.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Streaming completion for live narration
    ///
    /// Sends chunks to the provided channel as they arrive.
    /// Returns the final complete response.
    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError>;

    /// Model identifier sent with every request
    fn model(&self) -> &str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// How the mock answers
    enum Reply {
        /// Hand out these responses in order, then fail
        Scripted(Vec<CompletionResponse>),
        /// Answer with the number of turns in the request
        Echo,
    }

    /// Mock LLM client for unit tests
    pub struct MockLlmClient {
        reply: Reply,
        fail_at: Option<usize>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self::with_reply(Reply::Scripted(responses))
        }

        /// A client whose reply is the length of the transcript it was sent
        pub fn echo() -> Self {
            Self::with_reply(Reply::Echo)
        }

        fn with_reply(reply: Reply) -> Self {
            Self {
                reply,
                fail_at: None,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Make the call with this zero-based index fail with a 500
        pub fn failing_at(mut self, call: usize) -> Self {
            self.fail_at = Some(call);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Every request received so far, in call order
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::complete: called");
            let turns = request.messages.len();
            self.requests.lock().unwrap().push(request);

            if self.fail_at == Some(idx) {
                return Err(LlmError::ApiError {
                    status: 500,
                    message: "injected failure".to_string(),
                });
            }

            match &self.reply {
                Reply::Echo => Ok(CompletionResponse::text(turns.to_string())),
                Reply::Scripted(responses) => responses
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| LlmError::InvalidResponse("No more mock responses".to_string())),
            }
        }

        async fn stream(
            &self,
            request: CompletionRequest,
            chunk_tx: mpsc::Sender<StreamChunk>,
        ) -> Result<CompletionResponse, LlmError> {
            let response = self.complete(request).await?;
            if let Some(text) = &response.content {
                let _ = chunk_tx.send(StreamChunk::TextDelta(text.clone())).await;
            }
            Ok(response)
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::llm::Message;

        fn request(turns: usize) -> CompletionRequest {
            CompletionRequest {
                system_prompt: String::new(),
                messages: (0..turns).map(|i| Message::user(format!("turn {}", i))).collect(),
                max_tokens: 1000,
            }
        }

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::new(vec![
                CompletionResponse::text("Response 1"),
                CompletionResponse::text("Response 2"),
            ]);

            let resp1 = client.complete(request(1)).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.complete(request(3)).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests()[1].messages.len(), 3);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            assert!(client.complete(request(1)).await.is_err());
        }

        #[tokio::test]
        async fn test_echo_and_injected_failure() {
            let client = MockLlmClient::echo().failing_at(1);

            let resp = client.complete(request(5)).await.unwrap();
            assert_eq!(resp.content, Some("5".to_string()));

            let err = client.complete(request(7)).await.unwrap_err();
            assert_eq!(err.status(), Some(500));
            assert_eq!(client.call_count(), 2);
        }

        #[tokio::test]
        async fn test_stream_forwards_text() {
            let client = MockLlmClient::new(vec![CompletionResponse::text("streamed")]);
            let (tx, mut rx) = mpsc::channel(4);

            let resp = client.stream(request(1), tx).await.unwrap();
            assert_eq!(resp.content.as_deref(), Some("streamed"));
            assert!(matches!(rx.recv().await, Some(StreamChunk::TextDelta(t)) if t == "streamed"));
        }
    }
}
