use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::backend::{estimate_tokens, ChatRequest, GatewayClient, Message};
use crate::catalog::Plan;
use crate::entitlement::PlanResolver;
use crate::error::{AppError, AppResult, BackendError};
use crate::limiter::RateLimiter;
use crate::metering::UsageMeter;
use crate::prompts::TAG_EXTRACTION_PROMPT;
use crate::storage::{OperationType, Storage, SummaryTags, TagRecord};

/// Minimum plan for tag extraction.
const REQUIRED_PLAN: Plan = Plan::Pro;

/// Per-field caps applied to model output before persistence.
const MAX_SKILLS: usize = 20;
const MAX_TECHNOLOGIES: usize = 20;
const MAX_ROLES: usize = 10;
const MAX_ACTION_ITEMS: usize = 15;
const MAX_DECISIONS: usize = 10;
const MAX_SENTIMENTS: usize = 5;
const MAX_EMOTIONS: usize = 10;

/// Longest accepted tag entry; longer entries are truncated, not dropped.
const MAX_TAG_CHARS: usize = 120;

/// Confidence assumed when the model omits or mangles the score.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Input parameters for tag extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingParams {
    /// The summary to extract tags from
    pub summary_id: String,
    /// The summary text itself
    pub summary_text: String,
    /// Caller identity, also the rate-limit key
    pub caller_id: String,
}

/// Outcome envelope for tag extraction.
///
/// Premium denial and extraction failures are normal product states, not
/// errors: they come back as `success: false` with a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<SummaryTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

impl TaggingResult {
    fn denied(message: impl Into<String>, started: Instant) -> Self {
        Self {
            success: false,
            tags: None,
            error: Some(message.into()),
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Premium-gated tag extraction over a stored summary.
#[derive(Clone)]
pub struct TagExtractionGate {
    limiter: RateLimiter,
    resolver: PlanResolver,
    client: GatewayClient,
    meter: UsageMeter,
    storage: Arc<dyn Storage>,
    model_id: String,
    invoke_timeout: Duration,
}

impl TagExtractionGate {
    /// Create a new gate over its collaborators
    pub fn new(
        limiter: RateLimiter,
        resolver: PlanResolver,
        client: GatewayClient,
        meter: UsageMeter,
        storage: Arc<dyn Storage>,
        model_id: impl Into<String>,
        invoke_timeout: Duration,
    ) -> Self {
        Self {
            limiter,
            resolver,
            client,
            meter,
            storage,
            model_id: model_id.into(),
            invoke_timeout,
        }
    }

    /// Extract, validate, and persist tags for one summary.
    pub async fn extract(&self, params: TaggingParams) -> AppResult<TaggingResult> {
        let started = Instant::now();

        let admission = self.limiter.record_attempt(&params.caller_id);
        if !admission.allowed {
            return Err(AppError::RateLimited {
                retry_after_secs: admission.reset_after_secs.max(1),
            });
        }

        let plan = self.resolver.resolve(&params.caller_id).await;
        if plan < REQUIRED_PLAN {
            info!(
                caller_id = %params.caller_id,
                plan = %plan,
                "Tag extraction denied, premium plan required"
            );
            return Ok(TaggingResult::denied(
                "premium subscription required",
                started,
            ));
        }

        let request = ChatRequest::new(
            &self.model_id,
            vec![
                Message::system(TAG_EXTRACTION_PROMPT),
                Message::user(&params.summary_text),
            ],
        )
        .with_temperature(0.0);

        let response = match tokio::time::timeout(
            self.invoke_timeout,
            self.client.chat_completion(&request),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Ok(self.failed(&params, e, started)),
            Err(_) => {
                let e = BackendError::Timeout {
                    timeout_ms: self.invoke_timeout.as_millis() as u64,
                };
                return Ok(self.failed(&params, e, started));
            }
        };

        let completion = match response.choices.first() {
            Some(choice) => choice.message.content.clone(),
            None => {
                let e = BackendError::InvalidResponse {
                    message: "response contained no choices".to_string(),
                };
                return Ok(self.failed(&params, e, started));
            }
        };

        let usage = response.usage.as_ref();
        let tokens_in = usage
            .and_then(|u| u.prompt_tokens)
            .unwrap_or_else(|| estimate_tokens(&params.summary_text));
        let tokens_out = usage
            .and_then(|u| u.completion_tokens)
            .unwrap_or_else(|| estimate_tokens(&completion));

        let tags = parse_tags(&completion);
        let record = TagRecord::new(&params.summary_id, tags.clone());

        if let Err(e) = self.storage.upsert_tags(&record).await {
            warn!(
                summary_id = %params.summary_id,
                error = %e,
                "Failed to persist extracted tags"
            );
            return Ok(self.failed(&params, e, started));
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let usage_record = self
            .meter
            .build(
                &params.caller_id,
                None,
                &self.model_id,
                OperationType::Tagging,
                tokens_in,
                tokens_out,
            )
            .completed(elapsed_ms);
        self.meter.record_detached(usage_record);

        info!(
            summary_id = %params.summary_id,
            caller_id = %params.caller_id,
            latency_ms = elapsed_ms,
            "Tag extraction completed"
        );

        Ok(TaggingResult {
            success: true,
            tags: Some(tags),
            error: None,
            processing_time_ms: elapsed_ms,
        })
    }

    /// Failed attempts are still billed on the estimated input.
    fn failed(
        &self,
        params: &TaggingParams,
        error: impl std::fmt::Display,
        started: Instant,
    ) -> TaggingResult {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let message = error.to_string();

        let record = self
            .meter
            .build(
                &params.caller_id,
                None,
                &self.model_id,
                OperationType::Tagging,
                estimate_tokens(&params.summary_text),
                0,
            )
            .failed(&message, elapsed_ms);
        self.meter.record_detached(record);

        TaggingResult {
            success: false,
            tags: None,
            error: Some(message),
            processing_time_ms: elapsed_ms,
        }
    }
}

/// Coerce a model completion into validated, size-capped tags.
///
/// Deliberately lenient: the completion is unstructured text pushed toward
/// JSON and cannot be trusted to conform. Malformed fields become empty
/// lists; the whole payload failing to parse yields empty tags at default
/// confidence.
pub fn parse_tags(completion: &str) -> SummaryTags {
    let value = parse_json_block(completion).unwrap_or(Value::Null);

    SummaryTags {
        skills: string_list(&value, "skills", MAX_SKILLS),
        technologies: string_list(&value, "technologies", MAX_TECHNOLOGIES),
        roles: string_list(&value, "roles", MAX_ROLES),
        action_items: string_list(&value, "action_items", MAX_ACTION_ITEMS),
        decisions: string_list(&value, "decisions", MAX_DECISIONS),
        sentiments: string_list(&value, "sentiments", MAX_SENTIMENTS),
        emotions: string_list(&value, "emotions", MAX_EMOTIONS),
        confidence_score: value
            .get("confidence_score")
            .and_then(Value::as_f64)
            .map_or(DEFAULT_CONFIDENCE, |v| v.clamp(0.0, 1.0)),
    }
}

/// Parse a JSON object from a completion, tolerating surrounding prose or
/// code fences.
fn parse_json_block(completion: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(completion) {
        return Some(value);
    }

    let start = completion.find('{')?;
    let end = completion.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&completion[start..=end]).ok()
}

fn string_list(value: &Value, field: &str, cap: usize) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.chars().take(MAX_TAG_CHARS).collect())
                .take(cap)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_well_formed_tags() {
        let completion = json!({
            "skills": ["negotiation", "planning"],
            "technologies": ["rust"],
            "roles": ["engineer"],
            "action_items": ["ship the report by friday"],
            "decisions": ["adopt quarterly reviews"],
            "sentiments": ["positive"],
            "emotions": ["optimistic"],
            "confidence_score": 0.9
        })
        .to_string();

        let tags = parse_tags(&completion);
        assert_eq!(tags.skills, vec!["negotiation", "planning"]);
        assert_eq!(tags.confidence_score, 0.9);
    }

    #[test]
    fn test_lists_capped_preserving_prefix() {
        let skills: Vec<String> = (0..40).map(|i| format!("skill-{}", i)).collect();
        let completion = json!({ "skills": skills }).to_string();

        let tags = parse_tags(&completion);
        assert_eq!(tags.skills.len(), MAX_SKILLS);
        assert_eq!(tags.skills[0], "skill-0");
        assert_eq!(tags.skills[MAX_SKILLS - 1], format!("skill-{}", MAX_SKILLS - 1));
    }

    #[test]
    fn test_sentiments_capped_at_five() {
        let sentiments: Vec<String> = (0..9).map(|i| format!("s{}", i)).collect();
        let completion = json!({ "sentiments": sentiments }).to_string();
        assert_eq!(parse_tags(&completion).sentiments.len(), MAX_SENTIMENTS);
    }

    #[test]
    fn test_malformed_fields_coerced_to_empty() {
        let completion = json!({
            "skills": "not a list",
            "technologies": 7,
            "roles": null,
            "confidence_score": "high"
        })
        .to_string();

        let tags = parse_tags(&completion);
        assert!(tags.skills.is_empty());
        assert!(tags.technologies.is_empty());
        assert!(tags.roles.is_empty());
        assert_eq!(tags.confidence_score, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_confidence_clamped() {
        let completion = json!({ "confidence_score": 3.5 }).to_string();
        assert_eq!(parse_tags(&completion).confidence_score, 1.0);

        let completion = json!({ "confidence_score": -1.0 }).to_string();
        assert_eq!(parse_tags(&completion).confidence_score, 0.0);
    }

    #[test]
    fn test_non_string_items_skipped_and_entries_trimmed() {
        let completion = json!({
            "skills": ["  rust  ", "", 42, true, "go"]
        })
        .to_string();

        let tags = parse_tags(&completion);
        assert_eq!(tags.skills, vec!["rust", "go"]);
    }

    #[test]
    fn test_oversized_entries_truncated() {
        let completion = json!({ "skills": ["x".repeat(500)] }).to_string();
        let tags = parse_tags(&completion);
        assert_eq!(tags.skills[0].chars().count(), MAX_TAG_CHARS);
    }

    #[test]
    fn test_fenced_json_accepted() {
        let completion = format!(
            "Here you go:\n```json\n{}\n```",
            json!({ "skills": ["rust"] })
        );
        assert_eq!(parse_tags(&completion).skills, vec!["rust"]);
    }

    #[test]
    fn test_garbage_completion_yields_empty_tags() {
        let tags = parse_tags("I could not find any tags, sorry!");
        assert_eq!(tags, SummaryTags {
            confidence_score: DEFAULT_CONFIDENCE,
            ..SummaryTags::default()
        });
    }
}
