//! AI gateway client and the summarization invocation boundary.
//!
//! Two backend shapes are supported: the multi-model chat completions
//! endpoint and the historical single-model completions endpoint. Both hide
//! behind [`SummaryInvoker`] so the pipelines never branch on which one
//! serviced a call.

mod client;
mod invoker;
mod types;

pub use client::GatewayClient;
pub use invoker::{ChatBackend, InvocationOutput, InvokerSet, LegacyBackend, SummaryInvoker};
pub use types::{
    estimate_tokens, ChatRequest, ChatResponse, LegacyCompletionRequest, LegacyCompletionResponse,
    Message, MessageRole, RawQualityScores, Usage,
};
