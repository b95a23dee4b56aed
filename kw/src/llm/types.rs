//! LLM request/response types
//!
//! These model the Anthropic Messages API, reduced to what a wake needs:
//! plain text turns in, plain text out.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// One call's worth of input: the transcript so far plus limits
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Omitted from the API call when empty
    pub system_prompt: String,

    /// Every turn so far, ending with the newest user turn
    pub messages: Vec<Message>,

    pub max_tokens: u32,
}

/// One conversational turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What came back from one call
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Reply text; `None` when the model produced no text blocks
    pub content: Option<String>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// A finished text reply with no usage figures
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    /// The reply was cut off at the request's `max_tokens`
    MaxTokens,
    StopSequence,
}

impl From<&str> for StopReason {
    /// Anthropic `stop_reason` values; anything unrecognised counts as a normal end
    fn from(value: &str) -> Self {
        match value {
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token counts reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_creation_tokens: u64,
}

impl AddAssign<&TokenUsage> for TokenUsage {
    fn add_assign(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
    }
}

/// USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pricing {
    input: f64,
    output: f64,
}

impl Pricing {
    /// Rough list prices by model family; unknown models are priced as sonnet
    fn for_model(model: &str) -> Self {
        let (input, output) = if model.contains("opus") {
            (15.0, 75.0)
        } else if model.contains("haiku") {
            (0.25, 1.25)
        } else {
            (3.0, 15.0)
        };
        Self { input, output }
    }
}

impl TokenUsage {
    /// Estimated spend in USD
    ///
    /// Cache reads bill at a tenth of the input price and cache writes at
    /// a quarter more than it.
    pub fn cost_usd(&self, model: &str) -> f64 {
        let price = Pricing::for_model(model);
        let per_token = |count: u64, rate: f64| count as f64 * rate / 1_000_000.0;

        per_token(self.input_tokens, price.input)
            + per_token(self.output_tokens, price.output)
            + per_token(self.cache_read_tokens, price.input * 0.1)
            + per_token(self.cache_creation_tokens, price.input * 1.25)
    }
}

/// Pieces of a streamed reply, in arrival order
#[derive(Debug, Clone)]
pub enum StreamChunk {
    MessageStart { input_tokens: u64 },
    TextDelta(String),
    MessageDone { stop_reason: StopReason, usage: TokenUsage },
    Error(String),
}
