use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use super::client::GatewayClient;
use super::types::{
    estimate_tokens, ChatRequest, LegacyCompletionRequest, Message, RawQualityScores,
};
use crate::catalog::{ModelDescriptor, ModelFeature};
use crate::error::{BackendError, InvocationError};
use crate::prompts::SUMMARIZE_SYSTEM_PROMPT;

/// Output of one summarization call, normalized across backend shapes.
#[derive(Debug, Clone)]
pub struct InvocationOutput {
    /// The generated summary text.
    pub text: String,
    /// Input tokens, reported by the backend or estimated.
    pub tokens_in: u32,
    /// Output tokens, reported by the backend or estimated.
    pub tokens_out: u32,
    /// Wall-clock time around the backend call.
    pub processing_time_ms: u64,
    /// Quality signals, when the backend supplies them.
    pub reported_scores: Option<RawQualityScores>,
}

/// Boundary to the AI backend for summary generation.
///
/// Callers never learn which backend shape serviced the call. The invoker
/// does not retry; dropping the returned future cancels the request.
#[async_trait]
pub trait SummaryInvoker: Send + Sync {
    /// Generate a summary with the given model, bounded by `timeout`.
    async fn invoke(
        &self,
        model_id: &str,
        text: &str,
        source_context: Option<&Value>,
        timeout: Duration,
    ) -> Result<InvocationOutput, InvocationError>;
}

/// Multi-model chat-completions backend.
#[derive(Clone)]
pub struct ChatBackend {
    client: GatewayClient,
}

impl ChatBackend {
    /// Create a new chat backend over the gateway client
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }

    fn build_messages(text: &str, source_context: Option<&Value>) -> Vec<Message> {
        let mut messages = vec![Message::system(SUMMARIZE_SYSTEM_PROMPT)];
        if let Some(context) = source_context {
            messages.push(Message::system(format!("Conversation context: {}", context)));
        }
        messages.push(Message::user(text));
        messages
    }
}

#[async_trait]
impl SummaryInvoker for ChatBackend {
    async fn invoke(
        &self,
        model_id: &str,
        text: &str,
        source_context: Option<&Value>,
        timeout: Duration,
    ) -> Result<InvocationOutput, InvocationError> {
        let start = Instant::now();
        let request = ChatRequest::new(model_id, Self::build_messages(text, source_context))
            .with_temperature(0.3);

        let response = match tokio::time::timeout(timeout, self.client.chat_completion(&request))
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(failed(model_id, start, e)),
            Err(_) => {
                return Err(failed(
                    model_id,
                    start,
                    BackendError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    },
                ))
            }
        };

        let completion = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                failed(
                    model_id,
                    start,
                    BackendError::InvalidResponse {
                        message: "response contained no choices".to_string(),
                    },
                )
            })?;

        let usage = response.usage.as_ref();
        let tokens_in = usage
            .and_then(|u| u.prompt_tokens)
            .unwrap_or_else(|| estimate_tokens(text));
        let tokens_out = usage
            .and_then(|u| u.completion_tokens)
            .unwrap_or_else(|| estimate_tokens(&completion));

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            model = %model_id,
            latency_ms = elapsed_ms,
            tokens_in,
            tokens_out,
            "Chat summarization succeeded"
        );

        Ok(InvocationOutput {
            text: completion,
            tokens_in,
            tokens_out,
            processing_time_ms: elapsed_ms,
            reported_scores: response.quality,
        })
    }
}

/// Historical single-model completions backend.
///
/// The endpoint routes to one server-side model and never reports token
/// usage; counts are always estimated.
#[derive(Clone)]
pub struct LegacyBackend {
    client: GatewayClient,
}

impl LegacyBackend {
    /// Create a new legacy backend over the gateway client
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SummaryInvoker for LegacyBackend {
    async fn invoke(
        &self,
        model_id: &str,
        text: &str,
        source_context: Option<&Value>,
        timeout: Duration,
    ) -> Result<InvocationOutput, InvocationError> {
        let start = Instant::now();

        let mut prompt = format!("{}\n\n{}", SUMMARIZE_SYSTEM_PROMPT, text);
        if let Some(context) = source_context {
            prompt.push_str(&format!("\n\nConversation context: {}", context));
        }
        let request = LegacyCompletionRequest::new(prompt);

        let response =
            match tokio::time::timeout(timeout, self.client.legacy_completion(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(failed(model_id, start, e)),
                Err(_) => {
                    return Err(failed(
                        model_id,
                        start,
                        BackendError::Timeout {
                            timeout_ms: timeout.as_millis() as u64,
                        },
                    ))
                }
            };

        let completion = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| {
                failed(
                    model_id,
                    start,
                    BackendError::InvalidResponse {
                        message: "response contained no choices".to_string(),
                    },
                )
            })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            model = %model_id,
            latency_ms = elapsed_ms,
            "Legacy summarization succeeded"
        );

        Ok(InvocationOutput {
            tokens_in: estimate_tokens(text),
            tokens_out: estimate_tokens(&completion),
            text: completion,
            processing_time_ms: elapsed_ms,
            reported_scores: None,
        })
    }
}

/// Both backend shapes behind one dispatch point.
#[derive(Clone)]
pub struct InvokerSet {
    chat: ChatBackend,
    legacy: LegacyBackend,
}

impl InvokerSet {
    /// Create both backends over one shared gateway client
    pub fn new(client: GatewayClient) -> Self {
        Self {
            chat: ChatBackend::new(client.clone()),
            legacy: LegacyBackend::new(client),
        }
    }

    /// The invoker serving this model, chosen by its capability tags.
    pub fn for_model(&self, model: &ModelDescriptor) -> &dyn SummaryInvoker {
        if model.has_feature(ModelFeature::LegacyCompletions) {
            &self.legacy
        } else {
            &self.chat
        }
    }
}

fn failed(model_id: &str, start: Instant, source: BackendError) -> InvocationError {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    error!(
        model = %model_id,
        error = %source,
        latency_ms = elapsed_ms,
        "Summarization call failed"
    );
    InvocationError {
        model_id: model_id.to_string(),
        elapsed_ms,
        source,
    }
}
