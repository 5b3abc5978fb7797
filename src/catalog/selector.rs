use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ModelCatalog, ModelFeature, Plan};

/// Upsell hint returned when a caller requests a model above their plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradePrompt {
    /// Human-readable upgrade message.
    pub message: String,
    /// Plan the requested model requires.
    pub required_plan: Plan,
    /// Capabilities the caller is missing out on.
    pub model_features: Vec<ModelFeature>,
}

/// Outcome of model selection for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    /// The model that will serve the request.
    pub model_id: String,
    /// Present iff the caller asked for a model their plan does not cover.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_prompt: Option<UpgradePrompt>,
}

/// Policy that maps (requested model, resolved plan) to an allowed model.
#[derive(Clone)]
pub struct ModelSelector {
    catalog: Arc<ModelCatalog>,
}

impl ModelSelector {
    /// Create a new selector over the given catalog.
    pub fn new(catalog: Arc<ModelCatalog>) -> Self {
        Self { catalog }
    }

    /// Pick the model that serves this request.
    ///
    /// - No requested id: the plan's default, no prompt.
    /// - Requested and accessible: the requested model verbatim.
    /// - Requested above the plan: the plan's default plus an upgrade prompt.
    /// - Requested but unknown: treated as absent. A bad id is a caller typo,
    ///   not an entitlement gap, so no prompt is synthesized.
    pub fn select(&self, requested: Option<&str>, plan: Plan) -> Selection {
        let requested_model = requested.and_then(|id| self.catalog.get(id));

        match requested_model {
            Some(model) if model.required_plan <= plan => Selection {
                model_id: model.id.clone(),
                upgrade_prompt: None,
            },
            Some(model) => {
                let fallback = self.catalog.default_for(plan);
                debug!(
                    requested = %model.id,
                    selected = %fallback.id,
                    plan = %plan,
                    "Requested model above caller plan, falling back to default"
                );
                Selection {
                    model_id: fallback.id.clone(),
                    upgrade_prompt: Some(UpgradePrompt {
                        message: format!(
                            "{} is available on the {} plan and above. Upgrade to use it.",
                            model.display_name, model.required_plan
                        ),
                        required_plan: model.required_plan,
                        model_features: model.features.clone(),
                    }),
                }
            }
            None => Selection {
                model_id: self.catalog.default_for(plan).id.clone(),
                upgrade_prompt: None,
            },
        }
    }
}
