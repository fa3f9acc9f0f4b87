use failsafe::{backoff, failure_policy, Config, StateMachine, Error};
use failsafe::futures::CircuitBreaker;
use std::time::Duration;
use crate::core::errors::GuardrailError;

/// Consecutive oracle failures that open the breaker
pub const FAILURE_THRESHOLD: u32 = 5;

/// Cool-down before a half-open probe is allowed
pub const COOL_DOWN_SECS: u64 = 5;

/// Circuit breaker guarding the classification oracle
///
/// Policy:
/// - 5 consecutive failures triggers OPEN state
/// - 5 seconds cool-down period before HALF-OPEN (probe)
pub type OracleCircuitBreaker = StateMachine<
    failure_policy::ConsecutiveFailures<backoff::Constant>,
    ()
>;

/// Create a new standard circuit breaker instance
pub fn create_circuit_breaker() -> OracleCircuitBreaker {
    Config::new()
        .failure_policy(failure_policy::consecutive_failures(
            FAILURE_THRESHOLD,
            backoff::constant(Duration::from_secs(COOL_DOWN_SECS)),
        ))
        .build()
}

/// Execute an oracle call within the circuit breaker protection
///
/// The inner error is passed through untouched; a rejected call (breaker
/// open) fails fast as `OracleUnavailable` without touching the network.
pub async fn execute_with_cb<F, Fut, T>(
    cb: &OracleCircuitBreaker,
    operation: F,
) -> Result<T, GuardrailError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, GuardrailError>>,
{
    match cb.call(operation()).await {
        Ok(val) => Ok(val),
        Err(Error::Inner(e)) => Err(e),
        Err(Error::Rejected) => Err(GuardrailError::OracleUnavailable(
            "Circuit breaker open".to_string(),
        )),
    }
}
