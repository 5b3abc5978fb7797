use serde::{Deserialize, Serialize};

/// Message in a gateway conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to the multi-model chat completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new chat request for a model
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from the chat completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
    /// Gateway extension: per-dimension quality signals for the completion.
    pub quality: Option<RawQualityScores>,
}

/// A single completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

/// Assistant message content in a choice
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    pub content: String,
}

/// Request to the historical single-model completions endpoint.
///
/// The legacy backend routes every request to one server-side model; there
/// is no model field on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyCompletionRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LegacyCompletionRequest {
    /// Create a new legacy completion request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
        }
    }
}

/// Response from the legacy completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCompletionResponse {
    pub choices: Vec<LegacyChoice>,
}

/// A single legacy completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyChoice {
    pub text: String,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Per-dimension quality signals as reported by the gateway.
///
/// Every dimension is optional; absent dimensions are synthesized
/// downstream by the scorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQualityScores {
    pub coherence: Option<f64>,
    pub coverage: Option<f64>,
    pub style: Option<f64>,
    pub length: Option<f64>,
}

/// Estimate a token count for text the backend did not meter.
///
/// Fixed heuristic: characters divided by four, rounded up. Downstream cost
/// math always multiplies against a real number, never an absent one.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    ((chars + 3) / 4) as u32
}
