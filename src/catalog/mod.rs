//! Model registry and plan-gated model selection.
//!
//! The catalog is built once at startup, validated, and never mutated
//! afterwards, so it can be shared across request handlers without locking.

mod selector;

pub use selector::{ModelSelector, Selection, UpgradePrompt};

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A caller's subscription level.
///
/// Ordering is total and strict: Free < Pro < Enterprise. A model whose
/// `required_plan` is at or below the caller's plan is accessible.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Anonymous, demo, and unpaid callers.
    #[default]
    Free,
    /// Individual paid subscription.
    Pro,
    /// Team/organization subscription.
    Enterprise,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Pro => write!(f, "pro"),
            Plan::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            _ => Err(format!("Unknown plan: {}", s)),
        }
    }
}

/// Capability tag on a model entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFeature {
    /// Conversational-text summarization.
    Summarize,
    /// Structured tag extraction.
    Tagging,
    /// Served by the historical single-model completions endpoint.
    LegacyCompletions,
    /// Extended context window.
    LongContext,
}

impl fmt::Display for ModelFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFeature::Summarize => write!(f, "summarize"),
            ModelFeature::Tagging => write!(f, "tagging"),
            ModelFeature::LegacyCompletions => write!(f, "legacy_completions"),
            ModelFeature::LongContext => write!(f, "long_context"),
        }
    }
}

/// A single model entry in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Canonical model identifier (e.g. "gpt-4o-mini").
    pub id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Minimum plan required to use this model.
    pub required_plan: Plan,
    /// Cost per input token (USD).
    pub cost_per_input_token: f64,
    /// Cost per output token (USD).
    pub cost_per_output_token: f64,
    /// Capability tags.
    pub features: Vec<ModelFeature>,
}

impl ModelDescriptor {
    /// Create a new descriptor.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        required_plan: Plan,
        cost_per_input_token: f64,
        cost_per_output_token: f64,
        features: Vec<ModelFeature>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            required_plan,
            cost_per_input_token,
            cost_per_output_token,
            features,
        }
    }

    /// Whether this model carries the given capability tag.
    pub fn has_feature(&self, feature: ModelFeature) -> bool {
        self.features.contains(&feature)
    }
}

/// Static model registry, keyed by model id.
///
/// Insertion order is preserved; `default_for` uses it to break pricing ties.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
    by_id: HashMap<String, usize>,
    cheapest_free_idx: usize,
}

impl ModelCatalog {
    /// Build a catalog from descriptors, validating the registry.
    ///
    /// Validation failures are configuration errors: duplicate ids, negative
    /// prices, an empty table, or no Free-tier summarization model to fall
    /// back to.
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self, AppError> {
        if models.is_empty() {
            return Err(AppError::Config {
                message: "model catalog is empty".to_string(),
            });
        }

        let mut by_id = HashMap::with_capacity(models.len());
        for (idx, model) in models.iter().enumerate() {
            if model.cost_per_input_token < 0.0 || model.cost_per_output_token < 0.0 {
                return Err(AppError::Config {
                    message: format!("model {} has negative pricing", model.id),
                });
            }
            if by_id.insert(model.id.clone(), idx).is_some() {
                return Err(AppError::Config {
                    message: format!("duplicate model id in catalog: {}", model.id),
                });
            }
        }

        let cheapest_free_idx = Self::cheapest_for(&models, Plan::Free).ok_or_else(|| {
            AppError::Config {
                message: "catalog has no free-tier summarization model".to_string(),
            }
        })?;

        Ok(Self {
            models,
            by_id,
            cheapest_free_idx,
        })
    }

    /// The built-in production registry.
    pub fn builtin() -> Result<Self, AppError> {
        Self::new(vec![
            ModelDescriptor::new(
                "gpt-4o-mini",
                "GPT-4o mini",
                Plan::Free,
                0.000_000_15,
                0.000_000_60,
                vec![ModelFeature::Summarize, ModelFeature::Tagging],
            ),
            ModelDescriptor::new(
                "gpt-3.5-turbo-instruct",
                "GPT-3.5 Turbo Instruct",
                Plan::Free,
                0.000_001_50,
                0.000_002_00,
                vec![ModelFeature::Summarize, ModelFeature::LegacyCompletions],
            ),
            ModelDescriptor::new(
                "gpt-4o",
                "GPT-4o",
                Plan::Pro,
                0.000_002_50,
                0.000_010_00,
                vec![ModelFeature::Summarize, ModelFeature::Tagging],
            ),
            ModelDescriptor::new(
                "claude-3-5-sonnet",
                "Claude 3.5 Sonnet",
                Plan::Pro,
                0.000_003_00,
                0.000_015_00,
                vec![
                    ModelFeature::Summarize,
                    ModelFeature::Tagging,
                    ModelFeature::LongContext,
                ],
            ),
            ModelDescriptor::new(
                "o1",
                "OpenAI o1",
                Plan::Enterprise,
                0.000_015_00,
                0.000_060_00,
                vec![ModelFeature::Summarize, ModelFeature::LongContext],
            ),
        ])
    }

    /// Look up a model by id.
    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.by_id.get(id).map(|&idx| &self.models[idx])
    }

    /// The default model for a plan: the cheapest-input summarization model
    /// whose required plan is at or below `plan`, ties broken by insertion
    /// order.
    pub fn default_for(&self, plan: Plan) -> &ModelDescriptor {
        let idx = Self::cheapest_for(&self.models, plan).unwrap_or(self.cheapest_free_idx);
        &self.models[idx]
    }

    /// Whether the model exists and carries the given capability tag.
    pub fn supports(&self, id: &str, feature: ModelFeature) -> bool {
        self.get(id).is_some_and(|m| m.has_feature(feature))
    }

    /// All registered models, in insertion order.
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    fn cheapest_for(models: &[ModelDescriptor], plan: Plan) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (idx, model) in models.iter().enumerate() {
            if model.required_plan > plan || !model.has_feature(ModelFeature::Summarize) {
                continue;
            }
            // Strict comparison keeps the earliest entry on ties.
            match best {
                Some(b) if models[b].cost_per_input_token <= model.cost_per_input_token => {}
                _ => best = Some(idx),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, plan: Plan, input_cost: f64) -> ModelDescriptor {
        ModelDescriptor::new(
            id,
            id.to_uppercase(),
            plan,
            input_cost,
            input_cost * 4.0,
            vec![ModelFeature::Summarize],
        )
    }

    #[test]
    fn test_plan_ordering_is_strict() {
        assert!(Plan::Free < Plan::Pro);
        assert!(Plan::Pro < Plan::Enterprise);
        assert!(Plan::Enterprise > Plan::Free);
    }

    #[test]
    fn test_plan_round_trip() {
        for plan in [Plan::Free, Plan::Pro, Plan::Enterprise] {
            let parsed: Plan = plan.to_string().parse().unwrap();
            assert_eq!(parsed, plan);
        }
        assert!("platinum".parse::<Plan>().is_err());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let result = ModelCatalog::new(vec![]);
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = ModelCatalog::new(vec![
            model("m1", Plan::Free, 1e-7),
            model("m1", Plan::Pro, 2e-7),
        ]);
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[test]
    fn test_negative_pricing_rejected() {
        let result = ModelCatalog::new(vec![model("m1", Plan::Free, -1e-7)]);
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[test]
    fn test_no_free_model_rejected() {
        let result = ModelCatalog::new(vec![model("m1", Plan::Pro, 1e-7)]);
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let catalog = ModelCatalog::builtin().unwrap();
        assert!(catalog.get("does-not-exist").is_none());
    }

    #[test]
    fn test_default_for_picks_cheapest_accessible() {
        let catalog = ModelCatalog::new(vec![
            model("pricey", Plan::Free, 5e-7),
            model("cheap", Plan::Free, 1e-7),
            model("pro-only", Plan::Pro, 1e-8),
        ])
        .unwrap();

        assert_eq!(catalog.default_for(Plan::Free).id, "cheap");
        // Pro unlocks the cheaper pro-only model.
        assert_eq!(catalog.default_for(Plan::Pro).id, "pro-only");
    }

    #[test]
    fn test_default_for_ties_break_by_insertion_order() {
        let catalog = ModelCatalog::new(vec![
            model("first", Plan::Free, 1e-7),
            model("second", Plan::Free, 1e-7),
        ])
        .unwrap();

        assert_eq!(catalog.default_for(Plan::Enterprise).id, "first");
    }

    #[test]
    fn test_default_ignores_non_summarize_models() {
        let mut tagger = model("tagger", Plan::Free, 1e-9);
        tagger.features = vec![ModelFeature::Tagging];
        let catalog =
            ModelCatalog::new(vec![tagger, model("summarizer", Plan::Free, 1e-7)]).unwrap();

        assert_eq!(catalog.default_for(Plan::Free).id, "summarizer");
    }

    #[test]
    fn test_supports() {
        let catalog = ModelCatalog::builtin().unwrap();
        assert!(catalog.supports("gpt-4o-mini", ModelFeature::Tagging));
        assert!(!catalog.supports("o1", ModelFeature::Tagging));
        assert!(catalog.supports("gpt-3.5-turbo-instruct", ModelFeature::LegacyCompletions));
        assert!(!catalog.supports("missing", ModelFeature::Summarize));
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = ModelCatalog::builtin().unwrap();
        assert_eq!(catalog.default_for(Plan::Free).id, "gpt-4o-mini");
        assert!(catalog.models().len() >= 5);
    }
}
