//! Summary quality scoring.
//!
//! Normalizes whatever quality signals the backend reports into a full set
//! of dimensions plus a derived overall score, all in [0, 1].

use serde::{Deserialize, Serialize};

use crate::backend::RawQualityScores;

/// Score assumed for a dimension the backend did not report.
///
/// "Unscored, assume acceptable" - the same convention the product's
/// reporting surfaces use, deliberately not zero.
pub const DEFAULT_DIMENSION_SCORE: f64 = 0.8;

/// Normalized quality scores for one summary.
///
/// `overall` is always derived here, never accepted from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub coherence: f64,
    pub coverage: f64,
    pub style: f64,
    pub length: f64,
    pub overall: f64,
}

/// Aggregates reported quality signals into [`QualityScores`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer;

impl QualityScorer {
    /// Score a summary from whatever the backend reported.
    ///
    /// Reported dimensions are clamped into [0, 1]; absent dimensions take
    /// the documented default. `overall` is the unweighted mean of the
    /// dimensions actually reported, or the default when none were.
    pub fn score(&self, reported: Option<&RawQualityScores>) -> QualityScores {
        let raw = reported.cloned().unwrap_or_default();

        let present: Vec<f64> = [raw.coherence, raw.coverage, raw.style, raw.length]
            .into_iter()
            .flatten()
            .map(|v| v.clamp(0.0, 1.0))
            .collect();

        let overall = if present.is_empty() {
            DEFAULT_DIMENSION_SCORE
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        };

        QualityScores {
            coherence: dimension(raw.coherence),
            coverage: dimension(raw.coverage),
            style: dimension(raw.style),
            length: dimension(raw.length),
            overall,
        }
    }
}

fn dimension(value: Option<f64>) -> f64 {
    value.map_or(DEFAULT_DIMENSION_SCORE, |v| v.clamp(0.0, 1.0))
}
