//! Request pipelines.
//!
//! This module provides the two operation flows:
//! - [`SummarizeFlow`]: admission control, entitlement, model selection,
//!   invocation, scoring, metering, and persistence for one summary.
//! - [`TagExtractionGate`]: premium-gated structured-tag extraction over a
//!   stored summary, metered through the same usage ledger.

mod summarize;
mod tagging;

pub use summarize::*;
pub use tagging::*;
