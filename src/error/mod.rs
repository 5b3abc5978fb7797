use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Summary not found: {summary_id}")]
    SummaryNotFound { summary_id: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// AI gateway errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A failed AI invocation, tagged with the model that was called.
///
/// Elapsed wall-clock time is captured even on failure so usage metering
/// can bill the attempt.
#[derive(Debug, Error)]
#[error("model {model_id} invocation failed: {source}")]
pub struct InvocationError {
    pub model_id: String,
    pub elapsed_ms: u64,
    #[source]
    pub source: BackendError,
}

/// Subscription lookup errors
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("Subscription lookup failed: {message}")]
    Lookup { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for gateway operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type alias for subscription lookups
pub type EntitlementResult<T> = Result<T, EntitlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AppError::Validation {
            field: "text".to_string(),
            reason: "cannot be empty".to_string(),
        };
        assert_eq!(err.to_string(), "Validation failed: text - cannot be empty");

        let err = AppError::RateLimited {
            retry_after_secs: 42,
        };
        assert_eq!(err.to_string(), "Rate limit exceeded, retry after 42s");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Database connection failed: failed to connect"
        );

        let err = StorageError::SummaryNotFound {
            summary_id: "sum-123".to_string(),
        };
        assert_eq!(err.to_string(), "Summary not found: sum-123");

        let err = StorageError::Migration {
            message: "version mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Migration failed: version mismatch");
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Api {
            status: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 401 - unauthorized");

        let err = BackendError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "Request timeout after 5000ms");

        let err = BackendError::InvalidResponse {
            message: "malformed JSON".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid response: malformed JSON");
    }

    #[test]
    fn test_invocation_error_display() {
        let err = InvocationError {
            model_id: "gpt-4o".to_string(),
            elapsed_ms: 120,
            source: BackendError::Api {
                status: 503,
                message: "overloaded".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "model gpt-4o invocation failed: API error: 503 - overloaded"
        );
    }

    #[test]
    fn test_storage_error_conversion_to_app_error() {
        let storage_err = StorageError::Query {
            message: "syntax error".to_string(),
        };
        let app_err: AppError = storage_err.into();
        assert!(matches!(app_err, AppError::Storage(_)));
    }

    #[test]
    fn test_invocation_error_conversion_to_app_error() {
        let err = InvocationError {
            model_id: "gpt-4o-mini".to_string(),
            elapsed_ms: 7,
            source: BackendError::Timeout { timeout_ms: 1000 },
        };
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Invocation(_)));
        assert!(app_err.to_string().contains("gpt-4o-mini"));
    }
}
