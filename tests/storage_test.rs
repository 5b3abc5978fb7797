//! Integration tests for the SQLite storage layer
//!
//! Tests database operations using an in-memory SQLite database.

use serde_json::json;

use recap_server::scoring::{QualityScorer, QualityScores};
use recap_server::storage::{
    OperationType, SqliteStorage, Storage, SummaryRecord, SummaryTags, TagRecord, UsageRecord,
};

/// Create an in-memory storage instance for testing
async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

fn default_scores() -> QualityScores {
    QualityScorer.score(None)
}

#[cfg(test)]
mod summary_tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_summary() {
        let storage = create_test_storage().await;

        let summary = SummaryRecord::new("caller-1", "gpt-4o-mini", "A summary", default_scores());
        let result = storage.insert_summary(&summary).await;

        assert!(result.is_ok(), "Should insert summary successfully");
    }

    #[tokio::test]
    async fn test_get_summary_round_trip() {
        let storage = create_test_storage().await;

        let summary = SummaryRecord::new("caller-1", "gpt-4o-mini", "A summary", default_scores())
            .with_team("team-7")
            .with_source_context(json!({"channel": "slack"}))
            .with_tokens(120, 40)
            .with_timing(350);
        storage.insert_summary(&summary).await.unwrap();

        let retrieved = storage.get_summary(&summary.id).await.unwrap();

        assert!(retrieved.is_some(), "Summary should exist");
        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.id, summary.id);
        assert_eq!(retrieved.caller_id, "caller-1");
        assert_eq!(retrieved.team_id.as_deref(), Some("team-7"));
        assert_eq!(retrieved.source_context, Some(json!({"channel": "slack"})));
        assert_eq!(retrieved.tokens_in, 120);
        assert_eq!(retrieved.tokens_out, 40);
        assert_eq!(retrieved.processing_time_ms, 350);
        assert_eq!(retrieved.quality_scores.overall, 0.8);
    }

    #[tokio::test]
    async fn test_get_nonexistent_summary() {
        let storage = create_test_storage().await;

        let result = storage.get_summary("nonexistent-id").await.unwrap();

        assert!(result.is_none(), "Should return None for nonexistent summary");
    }
}

#[cfg(test)]
mod tags_tests {
    use super::*;

    fn sample_tags() -> SummaryTags {
        SummaryTags {
            skills: vec!["planning".to_string()],
            technologies: vec!["rust".to_string()],
            sentiments: vec!["positive".to_string()],
            confidence_score: 0.7,
            ..SummaryTags::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_tags() {
        let storage = create_test_storage().await;

        let record = TagRecord::new("summary-1", sample_tags());
        storage.upsert_tags(&record).await.unwrap();

        let retrieved = storage.get_tags("summary-1").await.unwrap().unwrap();
        assert_eq!(retrieved.tags, sample_tags());
    }

    #[tokio::test]
    async fn test_upsert_replaces_prior_tags() {
        let storage = create_test_storage().await;

        storage
            .upsert_tags(&TagRecord::new("summary-1", sample_tags()))
            .await
            .unwrap();

        let mut updated = sample_tags();
        updated.skills = vec!["negotiation".to_string()];
        updated.confidence_score = 0.9;
        storage
            .upsert_tags(&TagRecord::new("summary-1", updated.clone()))
            .await
            .unwrap();

        let retrieved = storage.get_tags("summary-1").await.unwrap().unwrap();
        assert_eq!(retrieved.tags, updated);
    }

    #[tokio::test]
    async fn test_get_tags_for_untagged_summary() {
        let storage = create_test_storage().await;
        assert!(storage.get_tags("summary-1").await.unwrap().is_none());
    }
}

#[cfg(test)]
mod file_backed_tests {
    use super::*;
    use recap_server::config::DatabaseConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_backed_storage_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested/recap.db"),
            max_connections: 2,
        };

        let storage = SqliteStorage::new(&config).await.unwrap();

        let summary = SummaryRecord::new("caller-1", "gpt-4o-mini", "persisted", default_scores());
        storage.insert_summary(&summary).await.unwrap();
        assert!(storage.get_summary(&summary.id).await.unwrap().is_some());
        assert!(config.path.exists());
    }
}

#[cfg(test)]
mod usage_tests {
    use super::*;

    #[tokio::test]
    async fn test_record_usage_round_trip() {
        let storage = create_test_storage().await;

        let record = UsageRecord::new("caller-1", "gpt-4o-mini", OperationType::Summarize)
            .with_org("org-1")
            .with_tokens(100, 25)
            .with_cost(0.000_03)
            .completed(200);
        storage.record_usage(&record).await.unwrap();

        let rows = storage.get_caller_usage("caller-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.org_id.as_deref(), Some("org-1"));
        assert_eq!(row.operation, OperationType::Summarize);
        assert_eq!(row.tokens_used(), 125);
        assert!(row.success);
    }

    #[tokio::test]
    async fn test_ledger_is_append_only_per_attempt() {
        let storage = create_test_storage().await;

        let success = UsageRecord::new("caller-1", "gpt-4o-mini", OperationType::Summarize)
            .completed(100);
        let failure = UsageRecord::new("caller-1", "gpt-4o-mini", OperationType::Summarize)
            .failed("gateway unavailable", 50);
        storage.record_usage(&success).await.unwrap();
        storage.record_usage(&failure).await.unwrap();

        let rows = storage.get_caller_usage("caller-1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.iter().filter(|r| r.success).count(), 1);
        assert_eq!(
            rows.iter()
                .find(|r| !r.success)
                .unwrap()
                .error_message
                .as_deref(),
            Some("gateway unavailable")
        );
    }

    #[tokio::test]
    async fn test_usage_scoped_to_caller() {
        let storage = create_test_storage().await;

        let record =
            UsageRecord::new("caller-1", "gpt-4o-mini", OperationType::Tagging).completed(10);
        storage.record_usage(&record).await.unwrap();

        assert!(storage.get_caller_usage("caller-2").await.unwrap().is_empty());
    }
}
