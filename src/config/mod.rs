use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub limits: LimitsConfig,
    pub billing: BillingConfig,
    pub tagging: TaggingConfig,
}

/// AI gateway API configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration for outbound gateway calls
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
}

/// Admission-control windows, one per operation class
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub summarize: WindowConfig,
    pub tagging: WindowConfig,
}

/// A single fixed-window limit: `max_attempts` per `window_secs`
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    pub max_attempts: u32,
    pub window_secs: u64,
}

/// Subscription store configuration.
///
/// When `base_url` is unset the resolver falls back to the static
/// caller->plan map in `plan_overrides` (and FREE for everyone else).
#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    pub plan_overrides: String,
}

/// Tag extraction configuration
#[derive(Debug, Clone)]
pub struct TaggingConfig {
    pub model_id: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gateway = GatewayConfig {
            api_key: env::var("RECAP_GATEWAY_API_KEY").map_err(|_| AppError::Config {
                message: "RECAP_GATEWAY_API_KEY is required".to_string(),
            })?,
            base_url: env::var("RECAP_GATEWAY_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("RECAP_DATABASE_PATH").unwrap_or_else(|_| "./data/recap.db".to_string()),
            ),
            max_connections: env::var("RECAP_DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        };

        let limits = LimitsConfig {
            summarize: WindowConfig {
                max_attempts: env::var("RECAP_SUMMARIZE_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                window_secs: env::var("RECAP_SUMMARIZE_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            },
            tagging: WindowConfig {
                max_attempts: env::var("RECAP_TAGGING_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
                window_secs: env::var("RECAP_TAGGING_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            },
        };

        let billing = BillingConfig {
            base_url: env::var("RECAP_BILLING_URL").ok(),
            timeout_ms: env::var("RECAP_BILLING_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
            plan_overrides: env::var("RECAP_PLANS").unwrap_or_default(),
        };

        let tagging = TaggingConfig {
            model_id: env::var("RECAP_TAGGING_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        };

        Ok(Config {
            gateway,
            database,
            logging,
            request,
            limits,
            billing,
            tagging,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            summarize: WindowConfig {
                max_attempts: 10,
                window_secs: 60,
            },
            tagging: WindowConfig {
                max_attempts: 5,
                window_secs: 60,
            },
        }
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-4o-mini".to_string(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 2000,
            plan_overrides: String::new(),
        }
    }
}
