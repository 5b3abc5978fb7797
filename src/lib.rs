//! # Recap Server
//!
//! A tiered AI summarization service: callers submit conversational text
//! and receive a generated summary, gated and priced by subscription plan.
//!
//! ## Features
//!
//! - **Admission Control**: per-client fixed-window rate limiting
//! - **Entitlements**: plan resolution with degrade-to-free semantics
//! - **Model Selection**: plan-gated model catalog with upgrade prompts
//! - **Dual Backends**: multi-model and legacy completion endpoints behind
//!   one invocation boundary
//! - **Quality Scoring**: normalized multi-dimensional summary scores
//! - **Usage Metering**: append-only cost ledger for every attempt
//! - **Tag Extraction**: premium-gated structured tags over stored summaries
//!
//! ## Architecture
//!
//! ```text
//! HTTP Client → Axum Routes → Pipelines → AI Gateway (HTTP)
//!                                  ↓
//!                            SQLite (summaries, usage)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use recap_server::{build_router, AppState, Config};
//! use recap_server::backend::GatewayClient;
//! use recap_server::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let gateway = GatewayClient::new(&config.gateway, config.request.clone())?;
//!     let state = Arc::new(AppState::new(config, storage, gateway)?);
//!     let app = build_router(state);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8787").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// AI gateway client and the summarization invocation boundary.
pub mod backend;
/// Model registry, plans, and plan-gated model selection.
pub mod catalog;
/// Configuration management for the server.
pub mod config;
/// Caller entitlement resolution.
pub mod entitlement;
/// Error types and result aliases for the application.
pub mod error;
/// Per-client admission control.
pub mod limiter;
/// Cost derivation and the usage ledger.
pub mod metering;
/// Summarization and tag-extraction pipelines.
pub mod pipeline;
/// System prompts sent to the AI gateway.
pub mod prompts;
/// Quality score normalization and aggregation.
pub mod scoring;
/// HTTP server, routes, and shared state.
pub mod server;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{build_router, AppState, SharedState};
