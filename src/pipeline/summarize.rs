use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{estimate_tokens, InvokerSet};
use crate::catalog::{ModelCatalog, ModelSelector, UpgradePrompt};
use crate::entitlement::PlanResolver;
use crate::error::{AppError, AppResult};
use crate::limiter::RateLimiter;
use crate::metering::UsageMeter;
use crate::scoring::{QualityScorer, QualityScores};
use crate::storage::{OperationType, Storage, SummaryRecord};

/// Input parameters for one summarization request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeParams {
    /// The conversational text to summarize
    pub text: String,
    /// Caller identity, also the rate-limit key
    pub caller_id: String,
    /// Optional team the caller acts for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Optional context about where the text came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_context: Option<Value>,
    /// Model the caller would like to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_model_id: Option<String>,
}

impl SummarizeParams {
    /// Create new params with text and caller
    pub fn new(text: impl Into<String>, caller_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            caller_id: caller_id.into(),
            team_id: None,
            source_context: None,
            preferred_model_id: None,
        }
    }

    /// Set the team
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Set the source context
    pub fn with_source_context(mut self, context: Value) -> Self {
        self.source_context = Some(context);
        self
    }

    /// Set the preferred model
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.preferred_model_id = Some(model_id.into());
        self
    }
}

/// Token and cost accounting for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageBreakdown {
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: f64,
    pub processing_time_ms: u64,
}

/// Result of one summarization request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResult {
    /// The persisted summary
    pub summary: SummaryRecord,
    /// Model that actually served the request
    pub model_used: String,
    /// Present when the caller asked for a model above their plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_prompt: Option<UpgradePrompt>,
    /// Token and cost accounting
    pub usage: UsageBreakdown,
    /// Normalized quality scores
    pub quality_scores: QualityScores,
}

/// The summarization pipeline.
///
/// Stateless per request apart from the injected rate limiter; every stage
/// boundary is a constructor argument so the flow is testable with fakes.
#[derive(Clone)]
pub struct SummarizeFlow {
    limiter: RateLimiter,
    resolver: PlanResolver,
    catalog: Arc<ModelCatalog>,
    selector: ModelSelector,
    invokers: InvokerSet,
    scorer: QualityScorer,
    meter: UsageMeter,
    storage: Arc<dyn Storage>,
    invoke_timeout: Duration,
}

impl SummarizeFlow {
    /// Create a new flow over its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        limiter: RateLimiter,
        resolver: PlanResolver,
        catalog: Arc<ModelCatalog>,
        invokers: InvokerSet,
        meter: UsageMeter,
        storage: Arc<dyn Storage>,
        invoke_timeout: Duration,
    ) -> Self {
        Self {
            limiter,
            resolver,
            selector: ModelSelector::new(Arc::clone(&catalog)),
            catalog,
            invokers,
            scorer: QualityScorer,
            meter,
            storage,
            invoke_timeout,
        }
    }

    /// Process one summarization request end to end.
    pub async fn process(&self, params: SummarizeParams) -> AppResult<SummarizeResult> {
        if params.text.trim().is_empty() {
            return Err(AppError::Validation {
                field: "text".to_string(),
                reason: "Text cannot be empty".to_string(),
            });
        }

        let admission = self.limiter.record_attempt(&params.caller_id);
        if !admission.allowed {
            return Err(AppError::RateLimited {
                retry_after_secs: admission.reset_after_secs.max(1),
            });
        }

        let plan = self.resolver.resolve(&params.caller_id).await;
        let selection = self
            .selector
            .select(params.preferred_model_id.as_deref(), plan);

        let model = self
            .catalog
            .get(&selection.model_id)
            .ok_or_else(|| AppError::Internal {
                message: format!("selected model {} not in catalog", selection.model_id),
            })?;

        debug!(
            caller_id = %params.caller_id,
            plan = %plan,
            model = %model.id,
            upgrade_prompted = selection.upgrade_prompt.is_some(),
            "Model selected"
        );

        let invoker = self.invokers.for_model(model);
        let output = match invoker
            .invoke(
                &model.id,
                &params.text,
                params.source_context.as_ref(),
                self.invoke_timeout,
            )
            .await
        {
            Ok(output) => output,
            Err(e) => {
                // Failed attempts are billed too, on the estimated input.
                let record = self
                    .meter
                    .build(
                        &params.caller_id,
                        params.team_id.as_deref(),
                        &model.id,
                        OperationType::Summarize,
                        estimate_tokens(&params.text),
                        0,
                    )
                    .failed(e.to_string(), e.elapsed_ms);
                self.meter.record_detached(record);
                return Err(e.into());
            }
        };

        let quality_scores = self.scorer.score(output.reported_scores.as_ref());
        let cost_usd = self
            .meter
            .cost_usd(&model.id, output.tokens_in, output.tokens_out);

        let mut summary = SummaryRecord::new(
            &params.caller_id,
            &model.id,
            &output.text,
            quality_scores,
        )
        .with_tokens(output.tokens_in, output.tokens_out)
        .with_timing(output.processing_time_ms);
        if let Some(team_id) = &params.team_id {
            summary = summary.with_team(team_id);
        }
        if let Some(context) = &params.source_context {
            summary = summary.with_source_context(context.clone());
        }

        // The summary is the primary artifact: a failed insert fails the
        // request, unlike the usage shadow record below.
        self.storage.insert_summary(&summary).await?;

        let record = self
            .meter
            .build(
                &params.caller_id,
                params.team_id.as_deref(),
                &model.id,
                OperationType::Summarize,
                output.tokens_in,
                output.tokens_out,
            )
            .completed(output.processing_time_ms);
        self.meter.record_detached(record);

        info!(
            summary_id = %summary.id,
            caller_id = %params.caller_id,
            model = %model.id,
            tokens_in = output.tokens_in,
            tokens_out = output.tokens_out,
            latency_ms = output.processing_time_ms,
            "Summarization completed"
        );

        Ok(SummarizeResult {
            model_used: model.id.clone(),
            upgrade_prompt: selection.upgrade_prompt,
            usage: UsageBreakdown {
                tokens_in: output.tokens_in,
                tokens_out: output.tokens_out,
                cost_usd,
                processing_time_ms: output.processing_time_ms,
            },
            quality_scores,
            summary,
        })
    }
}
