// Common test utilities and helpers for all test modules
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use sqli_guardrail::api::*;
use sqli_guardrail::core::errors::GuardrailError;
use sqli_guardrail::core::models::ToggleState;
use sqli_guardrail::state::verdict_cache::NoOpVerdictCache;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Oracle reply flagging a boolean injection
pub const BOOLEAN_INJECTION_REPLY: &str =
    "DETECTED: true\nTHREAT: Boolean Injection\nPAYLOAD: ' OR 1=1--";

/// Oracle reply for a benign request
pub const CLEAN_REPLY: &str = "DETECTED: false\nTHREAT: none\nPAYLOAD: none";

/// Mock ToggleStore holding the raw stored value in memory
pub struct MockToggleStore {
    pub raw: Mutex<Option<String>>,
    pub should_fail: AtomicBool,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl MockToggleStore {
    /// Store with the key absent
    pub fn empty() -> Self {
        Self {
            raw: Mutex::new(None),
            should_fail: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Store with the key already holding `state`
    pub fn with_state(state: ToggleState) -> Self {
        let store = Self::empty();
        *store.raw.lock().unwrap() = Some(state.as_stored().to_string());
        store
    }

    pub fn failing() -> Self {
        let store = Self::empty();
        store.should_fail.store(true, Ordering::SeqCst);
        store
    }

    /// Raw value as a direct store read would see it
    pub fn raw_value(&self) -> Option<String> {
        self.raw.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ToggleStore for MockToggleStore {
    async fn get_or_init(&self) -> Result<ToggleState, GuardrailError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(GuardrailError::StoreUnavailable("Redis connection failed".to_string()));
        }
        let mut raw = self.raw.lock().unwrap();
        let value = raw.get_or_insert_with(|| ToggleState::Active.as_stored().to_string());
        Ok(ToggleState::from_stored(value))
    }

    async fn set(&self, state: ToggleState) -> Result<(), GuardrailError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(GuardrailError::StoreUnavailable("Redis connection failed".to_string()));
        }
        *self.raw.lock().unwrap() = Some(state.as_stored().to_string());
        Ok(())
    }

    async fn ping(&self) -> Result<(), GuardrailError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(GuardrailError::StoreUnavailable("Redis connection failed".to_string()));
        }
        Ok(())
    }
}

/// Arguments the oracle was last called with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCall {
    pub method: String,
    pub url: String,
    pub body: String,
}

/// Mock ClassificationOracle returning a canned reply
pub struct MockOracle {
    pub reply: Result<String, GuardrailError>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub last_call: Mutex<Option<OracleCall>>,
}

impl MockOracle {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    pub fn failing(err: GuardrailError) -> Self {
        Self {
            reply: Err(err),
            ..Self::replying("")
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<OracleCall> {
        self.last_call.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ClassificationOracle for MockOracle {
    async fn classify(&self, method: &str, url: &str, body: &str) -> Result<String, GuardrailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some(OracleCall {
            method: method.to_string(),
            url: url.to_string(),
            body: body.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

/// Create a test AppState with the test config and no verdict cache
pub fn create_test_app_state(
    toggle_store: Arc<MockToggleStore>,
    oracle: Arc<MockOracle>,
) -> AppState {
    create_test_app_state_with(Config::test_config(), toggle_store, oracle, Arc::new(NoOpVerdictCache))
}

/// Create a test AppState with a custom config and cache
pub fn create_test_app_state_with(
    config: Config,
    toggle_store: Arc<MockToggleStore>,
    oracle: Arc<MockOracle>,
    cache: Arc<dyn VerdictCache + Send + Sync>,
) -> AppState {
    AppState::build(config, toggle_store, oracle, cache).expect("app state")
}

/// Router with state attached, ready for `oneshot`
pub fn create_test_app(app_state: AppState) -> Router {
    create_router(&app_state).with_state(app_state)
}

/// Build an auth subrequest as the reverse proxy would send it
pub fn subrequest(original_uri: Option<&str>, original_method: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/");
    if let Some(uri) = original_uri {
        builder = builder.header("X-Original-URI", uri);
    }
    if let Some(method) = original_method {
        builder = builder.header("X-Original-Method", method);
    }
    builder.body(body.into()).unwrap()
}

/// Simple GET request for admin endpoints
pub fn get(path: &str) -> Request<Body> {
    Request::builder().method("GET").uri(path).body(Body::empty()).unwrap()
}

/// Collect a response body into a string
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}
