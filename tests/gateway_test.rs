//! Integration tests for the gateway client and invocation boundary
//!
//! Tests HTTP behavior of both backend shapes using wiremock for
//! request/response mocking.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recap_server::backend::{
    ChatBackend, ChatRequest, GatewayClient, InvokerSet, LegacyBackend, Message, SummaryInvoker,
};
use recap_server::catalog::ModelCatalog;
use recap_server::config::{GatewayConfig, RequestConfig};
use recap_server::error::BackendError;

/// Create a test client pointing to the mock server
fn create_test_client(base_url: &str) -> GatewayClient {
    let config = GatewayConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
    };

    GatewayClient::new(&config, RequestConfig { timeout_ms: 5000 }).expect("Failed to create client")
}

const INVOKE_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(test)]
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_chat_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "A concise summary."}}],
                "usage": {
                    "prompt_tokens": 120,
                    "completion_tokens": 30,
                    "total_tokens": 150
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("Summarize this")]);
        let result = client.chat_completion(&request).await;

        assert!(result.is_ok(), "Call should succeed: {:?}", result.err());
        let response = result.unwrap();
        assert_eq!(response.choices[0].message.content, "A concise summary.");
        assert_eq!(response.usage.unwrap().prompt_tokens, Some(120));
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced_with_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
        let result = client.chat_completion(&request).await;

        match result {
            Err(BackendError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
        let result = client.chat_completion(&request).await;

        assert!(matches!(result, Err(BackendError::InvalidResponse { .. })));
    }
}

#[cfg(test)]
mod invoker_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_invoker_uses_reported_tokens_and_scores() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Summary text."}}],
                "usage": {"prompt_tokens": 200, "completion_tokens": 50},
                "quality": {"coherence": 0.9, "coverage": 0.7}
            })))
            .mount(&mock_server)
            .await;

        let invoker = ChatBackend::new(create_test_client(&mock_server.uri()));
        let output = invoker
            .invoke("gpt-4o-mini", "Some conversation", None, INVOKE_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(output.text, "Summary text.");
        assert_eq!(output.tokens_in, 200);
        assert_eq!(output.tokens_out, 50);
        let scores = output.reported_scores.unwrap();
        assert_eq!(scores.coherence, Some(0.9));
        assert_eq!(scores.style, None);
    }

    #[tokio::test]
    async fn test_chat_invoker_estimates_missing_tokens() {
        let mock_server = MockServer::start().await;

        // 40-char completion estimates to 10 tokens.
        let completion = "x".repeat(40);
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": completion}}]
            })))
            .mount(&mock_server)
            .await;

        let invoker = ChatBackend::new(create_test_client(&mock_server.uri()));
        let text = "y".repeat(400);
        let output = invoker
            .invoke("gpt-4o-mini", &text, None, INVOKE_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(output.tokens_in, 100);
        assert_eq!(output.tokens_out, 10);
        assert!(output.reported_scores.is_none());
    }

    #[tokio::test]
    async fn test_invoker_failure_carries_model_and_timing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let invoker = ChatBackend::new(create_test_client(&mock_server.uri()));
        let err = invoker
            .invoke("gpt-4o", "text", None, INVOKE_TIMEOUT)
            .await
            .unwrap_err();

        assert_eq!(err.model_id, "gpt-4o");
        assert!(matches!(err.source, BackendError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_invoker_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(json!({
                        "choices": [{"message": {"content": "too late"}}]
                    })),
            )
            .mount(&mock_server)
            .await;

        let invoker = ChatBackend::new(create_test_client(&mock_server.uri()));
        let err = invoker
            .invoke("gpt-4o-mini", "text", None, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err.source, BackendError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_legacy_invoker_hits_legacy_endpoint_and_estimates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"text": "Legacy summary."}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let invoker = LegacyBackend::new(create_test_client(&mock_server.uri()));
        let text = "z".repeat(80);
        let output = invoker
            .invoke("gpt-3.5-turbo-instruct", &text, None, INVOKE_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(output.text, "Legacy summary.");
        assert_eq!(output.tokens_in, 20);
        assert!(output.reported_scores.is_none());
    }

    #[tokio::test]
    async fn test_invoker_set_dispatches_by_feature() {
        let mock_server = MockServer::start().await;

        // Only the legacy endpoint is mounted; dispatching the legacy model
        // anywhere else would fail the call.
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"text": "ok"}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let catalog = ModelCatalog::builtin().unwrap();
        let legacy_model = catalog.get("gpt-3.5-turbo-instruct").unwrap();

        let invokers = InvokerSet::new(create_test_client(&mock_server.uri()));
        let output = invokers
            .for_model(legacy_model)
            .invoke(&legacy_model.id, "text", None, INVOKE_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(output.text, "ok");
    }
}
