// Integration tests for dependency failures under fail-closed and fail-open

use crate::common::*;
use axum::http::StatusCode;
use sqli_guardrail::api::Config;
use sqli_guardrail::core::errors::GuardrailError;
use sqli_guardrail::core::models::{FailureMode, ToggleState};
use sqli_guardrail::state::verdict_cache::NoOpVerdictCache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app_with_mode(mode: FailureMode, store: MockToggleStore, oracle: MockOracle) -> axum::Router {
    let mut config = Config::test_config();
    config.failure_mode = mode;
    create_test_app(create_test_app_state_with(
        config,
        Arc::new(store),
        Arc::new(oracle),
        Arc::new(NoOpVerdictCache),
    ))
}

#[tokio::test]
async fn test_store_failure_fails_closed() {
    let app = app_with_mode(
        FailureMode::Closed,
        MockToggleStore::failing(),
        MockOracle::replying(CLEAN_REPLY),
    );

    let response = app
        .oneshot(subrequest(Some("/search?q=1"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Service unavailable");
    assert!(json["request_id"].is_string());
}

#[tokio::test]
async fn test_oracle_failure_fails_closed_without_leaking_details() {
    let app = app_with_mode(
        FailureMode::Closed,
        MockToggleStore::with_state(ToggleState::Active),
        MockOracle::failing(GuardrailError::OracleUnavailable(
            "Oracle error: HTTP 401 Unauthorized".to_string(),
        )),
    );

    let response = app
        .oneshot(subrequest(Some("/search?q=1"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_string(response).await;
    assert!(!body.contains("401"));
}

#[tokio::test]
async fn test_request_id_is_echoed_on_failure() {
    let app = app_with_mode(
        FailureMode::Closed,
        MockToggleStore::failing(),
        MockOracle::replying(CLEAN_REPLY),
    );

    let mut request = subrequest(Some("/search?q=1"), Some("GET"), "");
    request
        .headers_mut()
        .insert("x-request-id", "req-abc".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    let json = body_json(response).await;
    assert_eq!(json["request_id"], "req-abc");
}

#[tokio::test]
async fn test_store_failure_fails_open() {
    let app = app_with_mode(
        FailureMode::Open,
        MockToggleStore::failing(),
        MockOracle::replying(BOOLEAN_INJECTION_REPLY),
    );

    let response = app
        .oneshot(subrequest(Some("/search?q=' OR 1=1--"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "{\"allowed\":true}");
}

#[tokio::test]
async fn test_oracle_timeout_fails_open() {
    let app = app_with_mode(
        FailureMode::Open,
        MockToggleStore::with_state(ToggleState::Active),
        MockOracle::failing(GuardrailError::OracleTimeout(10)),
    );

    let response = app
        .oneshot(subrequest(Some("/search?q=1"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_slow_oracle_hits_request_timeout() {
    let mut config = Config::test_config();
    config.request_timeout_secs = 1;
    let mut oracle = MockOracle::replying(CLEAN_REPLY);
    oracle.delay = Some(Duration::from_secs(5));

    let app = create_test_app(create_test_app_state_with(
        config,
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        Arc::new(oracle),
        Arc::new(NoOpVerdictCache),
    ));

    let response = app
        .oneshot(subrequest(Some("/search?q=1"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_dropped_request_cancels_oracle_call() {
    let mut oracle = MockOracle::replying(CLEAN_REPLY);
    oracle.delay = Some(Duration::from_secs(5));
    let oracle = Arc::new(oracle);
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
    ));

    // Caller gives up long before the oracle answers
    let result = tokio::time::timeout(
        Duration::from_millis(100),
        app.clone().oneshot(subrequest(Some("/search?q=1"), Some("GET"), "")),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(oracle.call_count(), 1);
    // In-flight future released its handle; the test and the live router keep theirs
    assert_eq!(Arc::strong_count(&oracle), 2);
}
