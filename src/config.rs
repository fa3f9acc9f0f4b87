// Configuration management

use crate::core::errors::GuardrailError;
use crate::core::models::FailureMode;
use crate::engine::exclusions::DEFAULT_STATIC_PREFIX;
use crate::oracle::prompt::DEFAULT_MODEL;
use crate::state::toggle_store::DEFAULT_TOGGLE_KEY;
use secrecy::SecretString;
use std::env;

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
/// The oracle API key is kept as a secret and never printed.
#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Redis configuration
    pub redis_url: String,
    pub redis_connection_timeout_secs: u64,
    pub redis_operation_timeout_secs: u64,
    pub toggle_key: String,

    // Oracle configuration
    pub oracle_base_url: String,
    pub oracle_api_key: SecretString,
    pub oracle_model: String,
    pub oracle_timeout_secs: u64,

    // Decision configuration
    pub failure_mode: FailureMode,
    pub static_prefix: String,
    pub excluded_paths: Vec<String>,
    pub verdict_cache_ttl_secs: Option<u64>,
    pub verdict_cache_max_entries: u64,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, GuardrailError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // File may not exist
        }

        let redis_url = Self::get_env_or_default("REDIS_URL", "redis://localhost:6379/0");

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port()?,
            redis_connection_timeout_secs: Self::detect_redis_connection_timeout(&redis_url)?,
            redis_url,
            redis_operation_timeout_secs: Self::parse_or_default("REDIS_OPERATION_TIMEOUT_SECS", 2)?,
            toggle_key: Self::get_env_or_default("TOGGLE_KEY", DEFAULT_TOGGLE_KEY),
            oracle_base_url: Self::get_env_or_default("ORACLE_BASE_URL", "https://api.openai.com/v1"),
            oracle_api_key: SecretString::new(Self::get_required_env("OPENAI_API_KEY")?),
            oracle_model: Self::get_env_or_default("ORACLE_MODEL", DEFAULT_MODEL),
            oracle_timeout_secs: Self::parse_or_default("ORACLE_TIMEOUT_SECS", 10)?,
            failure_mode: Self::parse_failure_mode()?,
            static_prefix: Self::get_env_or_default("STATIC_PREFIX", DEFAULT_STATIC_PREFIX),
            excluded_paths: Self::parse_list(&Self::get_env_or_default("EXCLUDE_PATHS", "")),
            verdict_cache_ttl_secs: Self::parse_optional("VERDICT_CACHE_TTL_SECS")?,
            verdict_cache_max_entries: Self::parse_or_default("VERDICT_CACHE_MAX_ENTRIES", 10_000)?,
            request_timeout_secs: Self::parse_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_or_default("BODY_SIZE_LIMIT_BYTES", 2 * 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get required, non-empty environment variable
    fn get_required_env(key: &str) -> Result<String, GuardrailError> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) => Err(GuardrailError::ConfigurationError(format!("{} is empty", key))),
            Err(_) => Err(GuardrailError::ConfigurationError(format!("{} not set", key))),
        }
    }

    /// Parse port from PORT environment variable
    fn parse_port() -> Result<u16, GuardrailError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port_str.parse::<u16>()
            .map_err(|e| GuardrailError::ConfigurationError(
                format!("Invalid PORT value '{}': {}", port_str, e)
            ))?;

        if port == 0 {
            return Err(GuardrailError::ConfigurationError(
                "PORT must be between 1 and 65535".to_string()
            ));
        }

        Ok(port)
    }

    /// Parse a positive number from an environment variable or return default
    fn parse_or_default<T>(key: &str, default: T) -> Result<T, GuardrailError>
    where
        T: std::str::FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        match env::var(key) {
            Ok(value) => Self::parse_positive(&value, key),
            Err(_) => Ok(default),
        }
    }

    /// Parse an optional positive number; unset or empty means `None`
    fn parse_optional<T>(key: &str) -> Result<Option<T>, GuardrailError>
    where
        T: std::str::FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Self::parse_positive(&value, key).map(Some),
            _ => Ok(None),
        }
    }

    fn parse_positive<T>(value: &str, key: &str) -> Result<T, GuardrailError>
    where
        T: std::str::FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        let parsed = value.parse::<T>()
            .map_err(|e| GuardrailError::ConfigurationError(
                format!("Invalid {} value '{}': {}", key, value, e)
            ))?;

        if parsed == T::default() {
            return Err(GuardrailError::ConfigurationError(
                format!("{} must be greater than 0", key)
            ));
        }

        Ok(parsed)
    }

    fn parse_failure_mode() -> Result<FailureMode, GuardrailError> {
        match env::var("FAILURE_MODE") {
            Ok(value) => value.parse::<FailureMode>()
                .map_err(|e| GuardrailError::ConfigurationError(format!("Invalid FAILURE_MODE: {}", e))),
            Err(_) => Ok(FailureMode::default()),
        }
    }

    /// Split a comma-separated list, dropping blanks
    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Detect Redis connection timeout based on environment
    ///
    /// Can be overridden with REDIS_CONNECTION_TIMEOUT_SECS.
    /// - localhost (127.0.0.1 or localhost): 15 seconds
    /// - remote Redis: 5 seconds
    fn detect_redis_connection_timeout(redis_url: &str) -> Result<u64, GuardrailError> {
        if let Ok(val) = env::var("REDIS_CONNECTION_TIMEOUT_SECS") {
            return Self::parse_positive(&val, "REDIS_CONNECTION_TIMEOUT_SECS");
        }

        let is_localhost = redis_url.contains("localhost") || redis_url.contains("127.0.0.1");
        Ok(if is_localhost { 15 } else { 5 })
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), GuardrailError> {
        Self::validate_url(&self.redis_url, "Redis URL")?;
        Self::validate_url(&self.oracle_base_url, "Oracle base URL")?;

        if self.toggle_key.is_empty() {
            return Err(GuardrailError::ConfigurationError(
                "TOGGLE_KEY must not be empty".to_string()
            ));
        }

        if self.oracle_timeout_secs >= self.request_timeout_secs {
            return Err(GuardrailError::ConfigurationError(format!(
                "ORACLE_TIMEOUT_SECS ({}) must be less than REQUEST_TIMEOUT_SECS ({})",
                self.oracle_timeout_secs, self.request_timeout_secs
            )));
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate URL format
    fn validate_url(url: &str, description: &str) -> Result<(), GuardrailError> {
        url::Url::parse(url)
            .map_err(|e| GuardrailError::ConfigurationError(
                format!("Invalid {} '{}': {}", description, url, e)
            ))?;
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), GuardrailError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(GuardrailError::ConfigurationError(
                format!("Invalid LOG_LEVEL '{}': must be one of {}", level, valid_levels.join(", "))
            ));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), GuardrailError> {
        if format != "json" && format != "text" {
            return Err(GuardrailError::ConfigurationError(
                format!("Invalid LOG_FORMAT '{}': must be 'json' or 'text'", format)
            ));
        }
        Ok(())
    }

    /// Whether identical requests should reuse a cached classification
    pub fn verdict_cache_enabled(&self) -> bool {
        self.verdict_cache_ttl_secs.is_some()
    }
}

impl Config {
    /// Create a test configuration for unit tests
    ///
    /// This bypasses environment variable loading and validation.
    pub fn test_config() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            redis_url: "redis://localhost:6379/0".to_string(),
            redis_connection_timeout_secs: 15,
            redis_operation_timeout_secs: 2,
            toggle_key: DEFAULT_TOGGLE_KEY.to_string(),
            oracle_base_url: "http://127.0.0.1:1".to_string(),
            oracle_api_key: SecretString::new("test-key".to_string()),
            oracle_model: DEFAULT_MODEL.to_string(),
            oracle_timeout_secs: 5,
            failure_mode: FailureMode::Closed,
            static_prefix: DEFAULT_STATIC_PREFIX.to_string(),
            excluded_paths: Vec::new(),
            verdict_cache_ttl_secs: None,
            verdict_cache_max_entries: 10_000,
            request_timeout_secs: 30,
            body_size_limit_bytes: 2 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}
