//! Caller entitlement resolution.
//!
//! The subscription store is an external collaborator; this module only
//! needs a single lookup against it. Lookup failures never fail a request:
//! the resolver degrades to the most restrictive plan.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::Plan;
use crate::config::BillingConfig;
use crate::error::{AppError, EntitlementError, EntitlementResult};

/// Lookup boundary against the external subscription store.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// The caller's plan, or `None` when the caller is unrecognized.
    async fn plan_for(&self, caller_id: &str) -> EntitlementResult<Option<Plan>>;
}

/// Static caller->plan map, used for dev/demo deployments and as the
/// fallback when no billing service is configured.
#[derive(Debug, Default)]
pub struct StaticPlanSource {
    plans: HashMap<String, Plan>,
}

impl StaticPlanSource {
    /// Parse a `caller=plan,caller=plan` override string. Malformed pairs
    /// are skipped with a warning rather than failing startup.
    pub fn from_overrides(overrides: &str) -> Self {
        let mut plans = HashMap::new();
        for pair in overrides.split(',').filter(|p| !p.trim().is_empty()) {
            match pair.split_once('=') {
                Some((caller, plan)) => match plan.trim().parse::<Plan>() {
                    Ok(plan) => {
                        plans.insert(caller.trim().to_string(), plan);
                    }
                    Err(e) => warn!(pair = %pair, error = %e, "Skipping plan override"),
                },
                None => warn!(pair = %pair, "Skipping malformed plan override"),
            }
        }
        Self { plans }
    }
}

#[async_trait]
impl PlanSource for StaticPlanSource {
    async fn plan_for(&self, caller_id: &str) -> EntitlementResult<Option<Plan>> {
        Ok(self.plans.get(caller_id).copied())
    }
}

/// Billing-service lookup over HTTP.
pub struct HttpPlanSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    plan: Plan,
}

impl HttpPlanSource {
    /// Create a new source against the billing service.
    pub fn new(base_url: &str, timeout_ms: u64) -> EntitlementResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(EntitlementError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PlanSource for HttpPlanSource {
    async fn plan_for(&self, caller_id: &str) -> EntitlementResult<Option<Plan>> {
        let url = format!("{}/v1/subscriptions/{}", self.base_url, caller_id);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(EntitlementError::Lookup {
                message: format!("billing service returned {}", response.status()),
            });
        }

        let subscription: SubscriptionResponse =
            response
                .json()
                .await
                .map_err(|e| EntitlementError::Lookup {
                    message: format!("failed to parse subscription: {}", e),
                })?;

        Ok(Some(subscription.plan))
    }
}

/// Resolves a caller identity to an entitlement tier.
///
/// Infallible by design: anonymous callers, unknown callers, and
/// subscription-store failures all resolve to FREE.
#[derive(Clone)]
pub struct PlanResolver {
    source: Arc<dyn PlanSource>,
}

impl PlanResolver {
    /// Create a resolver over the given source.
    pub fn new(source: Arc<dyn PlanSource>) -> Self {
        Self { source }
    }

    /// Build the resolver the configuration asks for.
    pub fn from_config(config: &BillingConfig) -> Result<Self, AppError> {
        let source: Arc<dyn PlanSource> = match &config.base_url {
            Some(url) => Arc::new(HttpPlanSource::new(url, config.timeout_ms).map_err(|e| {
                AppError::Config {
                    message: format!("invalid billing configuration: {}", e),
                }
            })?),
            None => Arc::new(StaticPlanSource::from_overrides(&config.plan_overrides)),
        };
        Ok(Self::new(source))
    }

    /// Resolve the caller's plan, degrading to FREE on any failure.
    pub async fn resolve(&self, caller_id: &str) -> Plan {
        match self.source.plan_for(caller_id).await {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                debug!(caller_id = %caller_id, "Caller not in subscription store, using free plan");
                Plan::Free
            }
            Err(e) => {
                warn!(caller_id = %caller_id, error = %e, "Subscription lookup failed, degrading to free plan");
                Plan::Free
            }
        }
    }
}
