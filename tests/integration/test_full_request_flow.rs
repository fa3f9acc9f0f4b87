// Integration test for the full subrequest flow: Proxy -> Guardrail -> Oracle
//
// Exercises the router end to end with in-memory store and oracle:
// 1. Header extraction (X-Original-URI / X-Original-Method)
// 2. Toggle gate and exclusions
// 3. Oracle reply parsing and verdict rendering

use crate::common::*;
use axum::http::StatusCode;
use sqli_guardrail::api::Config;
use sqli_guardrail::core::models::ToggleState;
use sqli_guardrail::state::verdict_cache::MokaVerdictCache;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_injection_is_blocked_with_threat_details() {
    let oracle = Arc::new(MockOracle::replying(BOOLEAN_INJECTION_REPLY));
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
    ));

    let response = app
        .oneshot(subrequest(Some("/search?q=' OR 1=1--"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["blocked"], true);
    assert_eq!(json["threat_type"], "Boolean Injection");
    assert_eq!(json["payload"], "' OR 1=1--");
    assert_eq!(json["target_url"], "/search?q=' OR 1=1--");
    assert_eq!(json["method"], "GET");
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn test_clean_request_returns_literal_allow_body() {
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        Arc::new(MockOracle::replying(CLEAN_REPLY)),
    ));

    let response = app
        .oneshot(subrequest(Some("/search?q=shoes"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "{\"allowed\":true}");
}

#[tokio::test]
async fn test_inactive_toggle_allows_without_oracle() {
    let oracle = Arc::new(MockOracle::replying(BOOLEAN_INJECTION_REPLY));
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::with_state(ToggleState::Inactive)),
        oracle.clone(),
    ));

    let response = app
        .oneshot(subrequest(Some("/search?q=' OR 1=1--"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_static_asset_allowed_without_oracle() {
    let oracle = Arc::new(MockOracle::replying(BOOLEAN_INJECTION_REPLY));
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
    ));

    let response = app
        .oneshot(subrequest(Some("/static/x.css"), Some("GET"), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_excluded_path_only_skips_get() {
    let mut config = Config::test_config();
    config.excluded_paths = vec!["/".to_string()];
    let oracle = Arc::new(MockOracle::replying(BOOLEAN_INJECTION_REPLY));
    let app = create_test_app(create_test_app_state_with(
        config,
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
        Arc::new(sqli_guardrail::state::verdict_cache::NoOpVerdictCache),
    ));

    let response = app
        .clone()
        .oneshot(subrequest(Some("/"), Some("GET"), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(oracle.call_count(), 0);

    let response = app
        .oneshot(subrequest(Some("/"), Some("POST"), "q=' OR 1=1--"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn test_missing_headers_use_defaults() {
    let oracle = Arc::new(MockOracle::replying(CLEAN_REPLY));
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
    ));

    let response = app.oneshot(subrequest(None, None, "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let call = oracle.last_call().unwrap();
    assert_eq!(call.url, "");
    assert_eq!(call.method, "GET");
}

#[tokio::test]
async fn test_body_forwarded_with_lossy_decoding() {
    let oracle = Arc::new(MockOracle::replying("DETECTED: true"));
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
    ));

    let body: Vec<u8> = b"user=admin\xff'--".to_vec();
    let response = app
        .oneshot(subrequest(Some("/login"), Some("POST"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["threat_type"], "SQL Injection Attempt");
    assert_eq!(json["payload"], "Not identified");
    assert_eq!(json["method"], "POST");

    let call = oracle.last_call().unwrap();
    assert_eq!(call.body, "user=admin\u{FFFD}'--");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = Config::test_config();
    config.body_size_limit_bytes = 16;
    let oracle = Arc::new(MockOracle::replying(CLEAN_REPLY));
    let app = create_test_app(create_test_app_state_with(
        config,
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
        Arc::new(sqli_guardrail::state::verdict_cache::NoOpVerdictCache),
    ));

    let response = app
        .oneshot(subrequest(Some("/login"), Some("POST"), "x".repeat(64)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_verdict_cache_reuses_classification() {
    let mut config = Config::test_config();
    config.verdict_cache_ttl_secs = Some(60);
    let oracle = Arc::new(MockOracle::replying(BOOLEAN_INJECTION_REPLY));
    let app = create_test_app(create_test_app_state_with(
        config,
        Arc::new(MockToggleStore::with_state(ToggleState::Active)),
        oracle.clone(),
        Arc::new(MokaVerdictCache::new(60, 100)),
    ));

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(subrequest(Some("/search?q=' OR 1=1--"), Some("GET"), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_subrequests() {
    let oracle = Arc::new(MockOracle::replying(CLEAN_REPLY));
    let app = create_test_app(create_test_app_state(
        Arc::new(MockToggleStore::empty()),
        oracle.clone(),
    ));

    let mut handles = Vec::new();
    for i in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let uri = format!("/item?id={}", i);
            app.oneshot(subrequest(Some(uri.as_str()), Some("GET"), ""))
                .await
                .unwrap()
                .status()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(oracle.call_count(), 20);
}
