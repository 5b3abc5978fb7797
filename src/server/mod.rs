//! HTTP server module.
//!
//! This module provides:
//! - Shared application state wiring all pipeline collaborators
//! - Route handlers and the error-to-status mapping

mod routes;

pub use routes::*;

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{GatewayClient, InvokerSet};
use crate::catalog::ModelCatalog;
use crate::config::Config;
use crate::entitlement::PlanResolver;
use crate::error::AppResult;
use crate::limiter::RateLimiter;
use crate::metering::UsageMeter;
use crate::pipeline::{SummarizeFlow, TagExtractionGate};
use crate::storage::{SqliteStorage, Storage};

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Persistence boundary.
    pub storage: Arc<dyn Storage>,
    /// Validated model registry.
    pub catalog: Arc<ModelCatalog>,
    /// Summarization pipeline.
    pub summarize: SummarizeFlow,
    /// Premium tag-extraction pipeline.
    pub tagging: TagExtractionGate,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: Config,
        storage: SqliteStorage,
        gateway: GatewayClient,
    ) -> AppResult<Self> {
        let storage: Arc<dyn Storage> = Arc::new(storage);
        let catalog = Arc::new(ModelCatalog::builtin()?);
        let resolver = PlanResolver::from_config(&config.billing)?;
        let meter = UsageMeter::new(Arc::clone(&catalog), Arc::clone(&storage));
        let invoke_timeout = Duration::from_millis(config.request.timeout_ms);

        let summarize = SummarizeFlow::new(
            RateLimiter::new(config.limits.summarize),
            resolver.clone(),
            Arc::clone(&catalog),
            InvokerSet::new(gateway.clone()),
            meter.clone(),
            Arc::clone(&storage),
            invoke_timeout,
        );

        let tagging = TagExtractionGate::new(
            RateLimiter::new(config.limits.tagging),
            resolver,
            gateway,
            meter,
            Arc::clone(&storage),
            config.tagging.model_id.clone(),
            invoke_timeout,
        );

        Ok(Self {
            config,
            storage,
            catalog,
            summarize,
            tagging,
        })
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
