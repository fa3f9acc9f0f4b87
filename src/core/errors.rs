// Domain error types - Secure error handling with no information disclosure

use thiserror::Error;

/// Main error type for the guardrail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardrailError {
    /// Toggle store unreachable or timed out (HTTP 503)
    #[error("Toggle store unavailable: {0}")]
    StoreUnavailable(String),

    /// Classification oracle unreachable or returned garbage (HTTP 503)
    #[error("Classification oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Classification oracle did not answer within the configured bound (HTTP 503)
    #[error("Classification oracle timed out after {0}s")]
    OracleTimeout(u64),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl GuardrailError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GuardrailError::StoreUnavailable(_) => 503,
            GuardrailError::OracleUnavailable(_) => 503,
            GuardrailError::OracleTimeout(_) => 503,
            GuardrailError::ConfigurationError(_) => 500,
        }
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            GuardrailError::StoreUnavailable(_)
            | GuardrailError::OracleUnavailable(_)
            | GuardrailError::OracleTimeout(_) => "Service unavailable".to_string(),
            GuardrailError::ConfigurationError(_) => "Internal error".to_string(),
        }
    }

    /// True for failures of an external dependency (store or oracle)
    pub fn is_dependency_failure(&self) -> bool {
        !matches!(self, GuardrailError::ConfigurationError(_))
    }
}
