use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::types::{ChatRequest, ChatResponse, LegacyCompletionRequest, LegacyCompletionResponse};
use crate::config::{GatewayConfig, RequestConfig};
use crate::error::{BackendError, BackendResult};

/// HTTP client for the AI completions gateway.
///
/// One instance is shared by both backend shapes; retry policy belongs to
/// callers, not here.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl GatewayClient {
    /// Create a new gateway client
    pub fn new(config: &GatewayConfig, request_config: RequestConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(BackendError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Call the multi-model chat completions endpoint
    pub async fn chat_completion(&self, request: &ChatRequest) -> BackendResult<ChatResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling chat completions endpoint"
        );
        self.post_json("/v1/chat/completions", request).await
    }

    /// Call the historical single-model completions endpoint
    pub async fn legacy_completion(
        &self,
        request: &LegacyCompletionRequest,
    ) -> BackendResult<LegacyCompletionResponse> {
        debug!(
            prompt_chars = request.prompt.len(),
            "Calling legacy completions endpoint"
        );
        self.post_json("/v1/completions", request).await
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<Req, Resp>(&self, path: &str, request: &Req) -> BackendResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    BackendError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }
}
