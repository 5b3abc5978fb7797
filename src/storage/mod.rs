//! Storage layer for summaries, extracted tags, and usage accounting.
//!
//! The `summaries` store holds the primary artifact and is on the critical
//! path. The `ai_usage_tracking` store is an append-only ledger written for
//! every AI invocation attempt; its writes are best-effort side effects.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::scoring::QualityScores;

/// The operation class an AI invocation was billed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Conversational-text summarization.
    #[default]
    Summarize,
    /// Structured tag extraction.
    Tagging,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Summarize => write!(f, "summarize"),
            OperationType::Tagging => write!(f, "tagging"),
        }
    }
}

impl std::str::FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summarize" => Ok(OperationType::Summarize),
            "tagging" => Ok(OperationType::Tagging),
            _ => Err(format!("Unknown operation type: {}", s)),
        }
    }
}

/// A persisted summary, the primary artifact of the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Unique summary identifier.
    pub id: String,
    /// Caller that requested the summary.
    pub caller_id: String,
    /// Optional team the caller acted for.
    pub team_id: Option<String>,
    /// Model that generated the summary.
    pub model_id: String,
    /// The summary text.
    pub text: String,
    /// Caller-supplied context about the source conversation.
    pub source_context: Option<serde_json::Value>,
    /// Input tokens consumed.
    pub tokens_in: u32,
    /// Output tokens produced.
    pub tokens_out: u32,
    /// Wall-clock generation time.
    pub processing_time_ms: u64,
    /// Normalized quality scores.
    pub quality_scores: QualityScores,
    /// When the summary was created.
    pub created_at: DateTime<Utc>,
}

impl SummaryRecord {
    /// Create a new summary record
    pub fn new(
        caller_id: impl Into<String>,
        model_id: impl Into<String>,
        text: impl Into<String>,
        quality_scores: QualityScores,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            caller_id: caller_id.into(),
            team_id: None,
            model_id: model_id.into(),
            text: text.into(),
            source_context: None,
            tokens_in: 0,
            tokens_out: 0,
            processing_time_ms: 0,
            quality_scores,
            created_at: Utc::now(),
        }
    }

    /// Set the team
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Set the source context
    pub fn with_source_context(mut self, context: serde_json::Value) -> Self {
        self.source_context = Some(context);
        self
    }

    /// Set token counts
    pub fn with_tokens(mut self, tokens_in: u32, tokens_out: u32) -> Self {
        self.tokens_in = tokens_in;
        self.tokens_out = tokens_out;
        self
    }

    /// Set processing time
    pub fn with_timing(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

/// One row in the append-only usage ledger.
///
/// Exactly one record exists per invocation attempt, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unique record identifier.
    pub id: String,
    /// Caller billed for the invocation.
    pub caller_id: String,
    /// Optional billed organization.
    pub org_id: Option<String>,
    /// Model that was invoked.
    pub model_id: String,
    /// Operation class.
    pub operation: OperationType,
    /// Input tokens (reported or estimated).
    pub tokens_in: u32,
    /// Output tokens (reported or estimated).
    pub tokens_out: u32,
    /// Derived cost in USD.
    pub cost_usd: f64,
    /// Wall-clock time of the attempt.
    pub processing_time_ms: u64,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Error message for failed attempts.
    pub error_message: Option<String>,
    /// When the attempt occurred.
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Create a new usage record
    pub fn new(
        caller_id: impl Into<String>,
        model_id: impl Into<String>,
        operation: OperationType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            caller_id: caller_id.into(),
            org_id: None,
            model_id: model_id.into(),
            operation,
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: 0.0,
            processing_time_ms: 0,
            success: true,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Set the billed organization
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Set token counts
    pub fn with_tokens(mut self, tokens_in: u32, tokens_out: u32) -> Self {
        self.tokens_in = tokens_in;
        self.tokens_out = tokens_out;
        self
    }

    /// Set the derived cost
    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = cost_usd;
        self
    }

    /// Mark as successful with timing
    pub fn completed(mut self, processing_time_ms: u64) -> Self {
        self.success = true;
        self.processing_time_ms = processing_time_ms;
        self
    }

    /// Mark as failed with error and timing
    pub fn failed(mut self, error: impl Into<String>, processing_time_ms: u64) -> Self {
        self.success = false;
        self.error_message = Some(error.into());
        self.processing_time_ms = processing_time_ms;
        self
    }

    /// Total tokens consumed by the attempt.
    pub fn tokens_used(&self) -> u32 {
        self.tokens_in + self.tokens_out
    }
}

/// Validated, size-capped tags extracted from a summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTags {
    pub skills: Vec<String>,
    pub technologies: Vec<String>,
    pub roles: Vec<String>,
    pub action_items: Vec<String>,
    pub decisions: Vec<String>,
    pub sentiments: Vec<String>,
    pub emotions: Vec<String>,
    /// Extraction confidence in [0, 1].
    pub confidence_score: f64,
}

/// Persisted tag set for one summary, upserted on re-extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    /// The summary these tags were extracted from.
    pub summary_id: String,
    /// The validated tags.
    pub tags: SummaryTags,
    /// When the tags were extracted.
    pub created_at: DateTime<Utc>,
}

impl TagRecord {
    /// Create a new tag record
    pub fn new(summary_id: impl Into<String>, tags: SummaryTags) -> Self {
        Self {
            summary_id: summary_id.into(),
            tags,
            created_at: Utc::now(),
        }
    }
}

/// Storage trait for database operations.
///
/// The pipelines only insert/upsert through this boundary; nothing here is
/// read back for policy decisions.
#[async_trait]
pub trait Storage: Send + Sync {
    // Summary operations

    /// Persist a summary. Critical path: failures propagate.
    async fn insert_summary(&self, summary: &SummaryRecord) -> StorageResult<()>;
    /// Fetch a summary by id.
    async fn get_summary(&self, id: &str) -> StorageResult<Option<SummaryRecord>>;

    // Tag operations

    /// Persist extracted tags, replacing any prior set for the summary.
    async fn upsert_tags(&self, record: &TagRecord) -> StorageResult<()>;
    /// Fetch the tags extracted for a summary.
    async fn get_tags(&self, summary_id: &str) -> StorageResult<Option<TagRecord>>;

    // Usage ledger

    /// Append one usage record.
    async fn record_usage(&self, record: &UsageRecord) -> StorageResult<()>;
    /// All usage records for a caller, newest first.
    async fn get_caller_usage(&self, caller_id: &str) -> StorageResult<Vec<UsageRecord>>;
}
