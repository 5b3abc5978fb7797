//! Usage metering: cost derivation and the append-only usage ledger.
//!
//! Ledger writes are a non-critical side channel: the pipelines dispatch
//! them on detached tasks and a write failure is logged, never surfaced.

use std::sync::Arc;

use tracing::warn;

use crate::catalog::ModelCatalog;
use crate::error::StorageResult;
use crate::storage::{OperationType, Storage, UsageRecord};

/// Computes invocation cost and writes usage records.
#[derive(Clone)]
pub struct UsageMeter {
    catalog: Arc<ModelCatalog>,
    storage: Arc<dyn Storage>,
}

impl UsageMeter {
    /// Create a new meter over the catalog and persistence boundary.
    pub fn new(catalog: Arc<ModelCatalog>, storage: Arc<dyn Storage>) -> Self {
        Self { catalog, storage }
    }

    /// Derive the USD cost of an invocation from catalog pricing.
    ///
    /// An unknown model id prices at zero; usage reporting must never fail
    /// because a model left the catalog.
    pub fn cost_usd(&self, model_id: &str, tokens_in: u32, tokens_out: u32) -> f64 {
        match self.catalog.get(model_id) {
            Some(model) => {
                f64::from(tokens_in) * model.cost_per_input_token
                    + f64::from(tokens_out) * model.cost_per_output_token
            }
            None => 0.0,
        }
    }

    /// Build a usage record with its cost filled in.
    pub fn build(
        &self,
        caller_id: &str,
        org_id: Option<&str>,
        model_id: &str,
        operation: OperationType,
        tokens_in: u32,
        tokens_out: u32,
    ) -> UsageRecord {
        let cost = self.cost_usd(model_id, tokens_in, tokens_out);
        let mut record = UsageRecord::new(caller_id, model_id, operation)
            .with_tokens(tokens_in, tokens_out)
            .with_cost(cost);
        if let Some(org) = org_id {
            record = record.with_org(org);
        }
        record
    }

    /// Write a usage record, surfacing storage errors (tests and callers
    /// that need confirmation).
    pub async fn record(&self, record: &UsageRecord) -> StorageResult<()> {
        self.storage.record_usage(record).await
    }

    /// Write a usage record on a detached task, fire-and-forget.
    pub fn record_detached(&self, record: UsageRecord) {
        let storage = Arc::clone(&self.storage);
        tokio::spawn(async move {
            if let Err(e) = storage.record_usage(&record).await {
                warn!(
                    caller_id = %record.caller_id,
                    model_id = %record.model_id,
                    error = %e,
                    "Failed to write usage record"
                );
            }
        });
    }
}
