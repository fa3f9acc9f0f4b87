// Redis-backed global enforcement toggle

use crate::api::ToggleStore;
use crate::core::errors::GuardrailError;
use crate::core::models::ToggleState;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::future::Future;
use tokio::time::Duration;

/// Key used when none is configured
pub const DEFAULT_TOGGLE_KEY: &str = "guardrail_status";

/// Toggle store persisted under a single Redis key as `"1"` / `"0"`
pub struct RedisToggleStore {
    connection_manager: ConnectionManager,
    key: String,
    operation_timeout: Duration,
}

impl RedisToggleStore {
    /// Connect to Redis, retrying with linear backoff and verifying with PING
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL
    /// * `key` - Key holding the toggle
    /// * `connection_timeout_secs` - Bound on each connection attempt
    /// * `operation_timeout_secs` - Bound on every subsequent command
    pub async fn new(
        redis_url: &str,
        key: &str,
        connection_timeout_secs: u64,
        operation_timeout_secs: u64,
    ) -> Result<Self, GuardrailError> {
        use tokio::time::sleep;

        const MAX_RETRIES: u32 = 3;
        const INITIAL_DELAY_MS: u64 = 1000;

        let mut connection_errors = Vec::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay_ms = INITIAL_DELAY_MS * attempt as u64; // 1s, 2s
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match Self::try_create_connection(redis_url, connection_timeout_secs).await {
                Ok(connection_manager) => {
                    let store = Self {
                        connection_manager,
                        key: key.to_string(),
                        operation_timeout: Duration::from_secs(operation_timeout_secs),
                    };

                    match store.ping().await {
                        Ok(_) => {
                            if attempt > 0 {
                                tracing::info!(
                                    "Redis connection succeeded on attempt {}",
                                    attempt + 1
                                );
                            }
                            return Ok(store);
                        }
                        Err(e) => {
                            connection_errors.push(format!("Connection created but ping failed: {}", e));
                        }
                    }
                }
                Err(e) => {
                    if attempt < MAX_RETRIES - 1 {
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            error = %e,
                            "Redis connection attempt failed, retrying..."
                        );
                    }
                    connection_errors.push(format!("Attempt {} failed: {}", attempt + 1, e));
                }
            }
        }

        Err(GuardrailError::StoreUnavailable(format!(
            "Failed to create Redis connection after {} attempts. Errors: {}. Check Redis URL: {}",
            MAX_RETRIES,
            connection_errors.join("; "),
            redis_url
        )))
    }

    async fn try_create_connection(
        redis_url: &str,
        connection_timeout_secs: u64,
    ) -> Result<ConnectionManager, GuardrailError> {
        // Validates URL format
        let client = Client::open(redis_url)
            .map_err(|e| GuardrailError::StoreUnavailable(
                format!("Invalid Redis URL format '{}': {}", redis_url, e)
            ))?;

        tokio::time::timeout(
            Duration::from_secs(connection_timeout_secs),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| GuardrailError::StoreUnavailable(format!(
            "Redis ConnectionManager creation timed out after {} seconds",
            connection_timeout_secs
        )))?
        .map_err(|e| GuardrailError::StoreUnavailable(
            format!("Failed to create Redis ConnectionManager: {}", e)
        ))
    }

    /// Run a Redis command under the operation timeout
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, GuardrailError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(GuardrailError::StoreUnavailable(format!("Failed to {}: {}", what, e))),
            Err(_) => Err(GuardrailError::StoreUnavailable(format!(
                "Timed out after {}s trying to {}",
                self.operation_timeout.as_secs(),
                what
            ))),
        }
    }

    /// Raw stored value, without default initialization
    pub async fn raw_value(&self) -> Result<Option<String>, GuardrailError> {
        let mut conn = self.connection_manager.clone();
        self.bounded("read toggle", conn.get::<_, Option<String>>(&self.key)).await
    }

    /// Remove the key entirely (used to reset to the "absent" state)
    pub async fn clear(&self) -> Result<(), GuardrailError> {
        let mut conn = self.connection_manager.clone();
        self.bounded("clear toggle", conn.del::<_, ()>(&self.key)).await
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl ToggleStore for RedisToggleStore {
    /// Read the toggle, writing the active default first if the key is absent.
    ///
    /// `SET NX` and `GET` run inside one MULTI/EXEC so concurrent cold reads
    /// cannot interleave between the existence check and the write.
    async fn get_or_init(&self) -> Result<ToggleState, GuardrailError> {
        let mut conn = self.connection_manager.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET").arg(&self.key).arg(ToggleState::Active.as_stored()).arg("NX").ignore()
            .cmd("GET").arg(&self.key);

        let (value,): (Option<String>,) = self
            .bounded("read toggle", pipe.query_async(&mut conn))
            .await?;

        // Not reachable under MULTI; treated as a store fault
        let value = value.ok_or_else(|| GuardrailError::StoreUnavailable(
            "Toggle key missing after initialization".to_string()
        ))?;

        Ok(ToggleState::from_stored(&value))
    }

    async fn set(&self, state: ToggleState) -> Result<(), GuardrailError> {
        let mut conn = self.connection_manager.clone();
        self.bounded("write toggle", conn.set::<_, _, ()>(&self.key, state.as_stored()))
            .await?;
        tracing::info!(key = %self.key, active = state.is_active(), "Toggle updated");
        Ok(())
    }

    async fn ping(&self) -> Result<(), GuardrailError> {
        let mut conn = self.connection_manager.clone();
        let result: String = self
            .bounded("ping Redis", redis::cmd("PING").query_async(&mut conn))
            .await?;

        if result == "PONG" {
            Ok(())
        } else {
            Err(GuardrailError::StoreUnavailable(
                format!("Redis ping returned unexpected response: {}", result)
            ))
        }
    }
}
