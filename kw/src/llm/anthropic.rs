//! Anthropic Claude API client implementation
//!
//! Implements the LlmClient trait for Anthropic's Messages API with
//! support for both blocking and streaming responses. Failures are
//! returned to the caller as-is; this client never retries.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, StreamChunk, TokenUsage};
use crate::config::LlmConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Seconds to report when a 429 carries no usable retry-after header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Anthropic Claude API client
pub struct AnthropicClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::MissingCredentials(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    /// Build the request body for the Anthropic API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, turns = request.messages.len(), "build_request_body: called");
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.min(self.max_tokens),
            "messages": request.messages,
        });

        if !request.system_prompt.is_empty() {
            body["system"] = serde_json::json!(request.system_prompt);
        }

        body
    }

    fn post(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
    }

    /// Turn a non-streamed reply into a response; text blocks are joined
    fn parse_response(&self, api_response: AnthropicResponse) -> CompletionResponse {
        debug!(?api_response.stop_reason, blocks = api_response.content.len(), "parse_response: called");
        let text: String = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect();

        CompletionResponse {
            content: (!text.is_empty()).then_some(text),
            stop_reason: api_response
                .stop_reason
                .as_deref()
                .map(StopReason::from)
                .unwrap_or(StopReason::EndTurn),
            usage: api_response.usage.into(),
        }
    }
}

/// Map a non-success HTTP response to an LlmError
async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        debug!(%retry_after, "error_from_response: rate limited");
        return LlmError::RateLimited {
            retry_after: Duration::from_secs(retry_after),
        };
    }

    let message = response.text().await.unwrap_or_default();
    debug!(%status, %message, "error_from_response: API error");
    LlmError::ApiError { status, message }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let response = self.post(&self.build_request_body(&request)).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let api_response: AnthropicResponse = response.json().await?;
        Ok(self.parse_response(api_response))
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "stream: called");
        let mut body = self.build_request_body(&request);
        body["stream"] = serde_json::Value::Bool(true);

        let mut es = EventSource::new(self.post(&body)).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let mut reply = StreamedReply::default();

        // The event source reconnects on its own, so every exit closes it.
        // Only message_stop completes a reply; anything else that ends the
        // stream leaves it cut off.
        let outcome = loop {
            let Some(event) = es.next().await else {
                break Err(truncated());
            };
            let message = match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => message,
                Err(reqwest_eventsource::Error::InvalidStatusCode(_, response)) => {
                    break Err(error_from_response(response).await);
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break Err(truncated()),
                Err(e) => break Err(LlmError::InvalidResponse(e.to_string())),
            };

            let event: SseEvent = match serde_json::from_str(&message.data) {
                Ok(event) => event,
                Err(e) => break Err(e.into()),
            };
            match reply.apply(event) {
                Step::Emit(chunk) => {
                    let _ = chunk_tx.send(chunk).await;
                }
                Step::Continue => {}
                Step::Finished => break Ok(()),
                Step::Failed(message) => break Err(LlmError::InvalidResponse(message)),
            }
        };
        es.close();

        if let Err(err) = outcome {
            debug!(%err, "stream: failed");
            let _ = chunk_tx.send(StreamChunk::Error(err.to_string())).await;
            return Err(err);
        }

        let response = reply.finish();
        debug!(?response.stop_reason, "stream: complete");
        let _ = chunk_tx
            .send(StreamChunk::MessageDone {
                stop_reason: response.stop_reason,
                usage: response.usage.clone(),
            })
            .await;
        Ok(response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn truncated() -> LlmError {
    LlmError::InvalidResponse("stream ended before message_stop".to_string())
}

/// What to do after folding one stream event into the reply
#[derive(Debug)]
enum Step {
    Emit(StreamChunk),
    Continue,
    Finished,
    Failed(String),
}

/// A reply being assembled from server-sent events
#[derive(Debug, Default)]
struct StreamedReply {
    text: String,
    stop_reason: Option<StopReason>,
    usage: TokenUsage,
}

impl StreamedReply {
    fn apply(&mut self, event: SseEvent) -> Step {
        match event {
            SseEvent::MessageStart { message } => {
                self.usage = message.usage.into();
                Step::Emit(StreamChunk::MessageStart {
                    input_tokens: self.usage.input_tokens,
                })
            }
            SseEvent::ContentBlockDelta { delta } => match delta.text {
                Some(text) => {
                    self.text.push_str(&text);
                    Step::Emit(StreamChunk::TextDelta(text))
                }
                None => Step::Continue,
            },
            SseEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason {
                    self.stop_reason = Some(StopReason::from(reason.as_str()));
                }
                if let Some(usage) = usage {
                    self.usage.output_tokens = usage.output_tokens;
                }
                Step::Continue
            }
            SseEvent::MessageStop => Step::Finished,
            SseEvent::Error { error } => Step::Failed(error.message),
            SseEvent::Other => Step::Continue,
        }
    }

    fn finish(self) -> CompletionResponse {
        CompletionResponse {
            content: (!self.text.is_empty()).then_some(self.text),
            stop_reason: self.stop_reason.unwrap_or(StopReason::EndTurn),
            usage: self.usage,
        }
    }
}

// Anthropic API wire types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
    cache_read_input_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
}

impl From<AnthropicUsage> for TokenUsage {
    fn from(usage: AnthropicUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cache_read_tokens: usage.cache_read_input_tokens.unwrap_or(0),
            cache_creation_tokens: usage.cache_creation_input_tokens.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseEvent {
    MessageStart {
        message: SseMessage,
    },
    ContentBlockDelta {
        delta: SseTextDelta,
    },
    MessageDelta {
        delta: SseMessageDelta,
        usage: Option<SseOutputUsage>,
    },
    MessageStop,
    Error {
        error: SseError,
    },
    /// ping, content_block_start, content_block_stop
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SseMessage {
    #[serde(default)]
    usage: AnthropicUsage,
}

/// Only `text_delta` carries text; other delta kinds leave it unset
#[derive(Debug, Deserialize)]
struct SseTextDelta {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseMessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseOutputUsage {
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct SseError {
    message: String,
}
