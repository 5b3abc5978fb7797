use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::{Storage, SummaryRecord, SummaryTags, TagRecord, UsageRecord};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::scoring::QualityScores;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory storage instance (tests and dev)
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?;

        // A single connection keeps the in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn insert_summary(&self, summary: &SummaryRecord) -> StorageResult<()> {
        let source_context = summary
            .source_context
            .as_ref()
            .map(|c| serde_json::to_string(c).unwrap_or_default());
        let quality_scores =
            serde_json::to_string(&summary.quality_scores).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO summaries
                (id, caller_id, team_id, model_id, text, source_context,
                 tokens_in, tokens_out, processing_time_ms, quality_scores, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&summary.id)
        .bind(&summary.caller_id)
        .bind(&summary.team_id)
        .bind(&summary.model_id)
        .bind(&summary.text)
        .bind(&source_context)
        .bind(i64::from(summary.tokens_in))
        .bind(i64::from(summary.tokens_out))
        .bind(summary.processing_time_ms as i64)
        .bind(&quality_scores)
        .bind(summary.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_summary(&self, id: &str) -> StorageResult<Option<SummaryRecord>> {
        let row: Option<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, caller_id, team_id, model_id, text, source_context,
                   tokens_in, tokens_out, processing_time_ms, quality_scores, created_at
            FROM summaries
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn upsert_tags(&self, record: &TagRecord) -> StorageResult<()> {
        let tags = serde_json::to_string(&record.tags).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO summary_tags (summary_id, tags, confidence_score, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(summary_id) DO UPDATE SET
                tags = excluded.tags,
                confidence_score = excluded.confidence_score,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.summary_id)
        .bind(&tags)
        .bind(record.tags.confidence_score)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_tags(&self, summary_id: &str) -> StorageResult<Option<TagRecord>> {
        let row: Option<TagsRow> = sqlx::query_as(
            r#"
            SELECT summary_id, tags, confidence_score, created_at
            FROM summary_tags
            WHERE summary_id = ?
            "#,
        )
        .bind(summary_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn record_usage(&self, record: &UsageRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ai_usage_tracking
                (id, caller_id, org_id, model_id, operation_type,
                 tokens_in, tokens_out, cost_usd, processing_time_ms,
                 success, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.caller_id)
        .bind(&record.org_id)
        .bind(&record.model_id)
        .bind(record.operation.to_string())
        .bind(i64::from(record.tokens_in))
        .bind(i64::from(record.tokens_out))
        .bind(record.cost_usd)
        .bind(record.processing_time_ms as i64)
        .bind(record.success)
        .bind(&record.error_message)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_caller_usage(&self, caller_id: &str) -> StorageResult<Vec<UsageRecord>> {
        let rows: Vec<UsageRow> = sqlx::query_as(
            r#"
            SELECT id, caller_id, org_id, model_id, operation_type,
                   tokens_in, tokens_out, cost_usd, processing_time_ms,
                   success, error_message, created_at
            FROM ai_usage_tracking
            WHERE caller_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(caller_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: String,
    caller_id: String,
    team_id: Option<String>,
    model_id: String,
    text: String,
    source_context: Option<String>,
    tokens_in: i64,
    tokens_out: i64,
    processing_time_ms: i64,
    quality_scores: String,
    created_at: String,
}

impl From<SummaryRow> for SummaryRecord {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            caller_id: row.caller_id,
            team_id: row.team_id,
            model_id: row.model_id,
            text: row.text,
            source_context: row.source_context.and_then(|s| serde_json::from_str(&s).ok()),
            tokens_in: row.tokens_in.max(0) as u32,
            tokens_out: row.tokens_out.max(0) as u32,
            processing_time_ms: row.processing_time_ms.max(0) as u64,
            quality_scores: serde_json::from_str(&row.quality_scores)
                .unwrap_or_else(|_| QualityScores {
                    coherence: 0.0,
                    coverage: 0.0,
                    style: 0.0,
                    length: 0.0,
                    overall: 0.0,
                }),
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagsRow {
    summary_id: String,
    tags: String,
    #[allow(dead_code)]
    confidence_score: f64,
    created_at: String,
}

impl From<TagsRow> for TagRecord {
    fn from(row: TagsRow) -> Self {
        Self {
            summary_id: row.summary_id,
            tags: serde_json::from_str::<SummaryTags>(&row.tags).unwrap_or_default(),
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UsageRow {
    id: String,
    caller_id: String,
    org_id: Option<String>,
    model_id: String,
    operation_type: String,
    tokens_in: i64,
    tokens_out: i64,
    cost_usd: f64,
    processing_time_ms: i64,
    success: bool,
    error_message: Option<String>,
    created_at: String,
}

impl From<UsageRow> for UsageRecord {
    fn from(row: UsageRow) -> Self {
        Self {
            id: row.id,
            caller_id: row.caller_id,
            org_id: row.org_id,
            model_id: row.model_id,
            operation: row.operation_type.parse().unwrap_or_default(),
            tokens_in: row.tokens_in.max(0) as u32,
            tokens_out: row.tokens_out.max(0) as u32,
            cost_usd: row.cost_usd,
            processing_time_ms: row.processing_time_ms.max(0) as u64,
            success: row.success,
            error_message: row.error_message,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

fn parse_timestamp(value: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}
