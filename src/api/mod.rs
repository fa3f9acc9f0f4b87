// Axum web server layer

use axum::{Router, error_handling::HandleErrorLayer, extract::DefaultBodyLimit, http::StatusCode, BoxError};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;

pub mod handlers;
pub mod middleware;
pub mod responses;

use crate::core::errors::GuardrailError;
use crate::core::models::ToggleState;
use crate::engine::decision::DecisionService;
use crate::engine::exclusions::ExclusionRules;
use crate::engine::reply_parser::ParsedReply;
use crate::metrics::DecisionMetrics;

/// Application state containing all shared dependencies
///
/// Built once at startup and cloned into every handler. All components are
/// wrapped in Arc for shared ownership across async tasks.
#[derive(Clone)]
pub struct AppState {
    pub decision_service: Arc<DecisionService>,
    pub toggle_store: Arc<dyn ToggleStore + Send + Sync>,
    pub metrics: Arc<DecisionMetrics>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the decision service from configuration and external handles
    pub fn build(
        config: Config,
        toggle_store: Arc<dyn ToggleStore + Send + Sync>,
        oracle: Arc<dyn ClassificationOracle + Send + Sync>,
        cache: Arc<dyn VerdictCache + Send + Sync>,
    ) -> Result<Self, GuardrailError> {
        let metrics = Arc::new(DecisionMetrics::new().map_err(|e| {
            GuardrailError::ConfigurationError(format!("Failed to register metrics: {}", e))
        })?);

        let exclusions = ExclusionRules::new(
            config.static_prefix.clone(),
            config.excluded_paths.iter().cloned(),
        );

        let decision_service = Arc::new(DecisionService::new(
            toggle_store.clone(),
            oracle,
            cache,
            exclusions,
            config.failure_mode,
            metrics.clone(),
        ));

        Ok(Self {
            decision_service,
            toggle_store,
            metrics,
            config: Arc::new(config),
        })
    }
}

/// Persistent global enforcement toggle
#[async_trait::async_trait]
pub trait ToggleStore: Send + Sync {
    /// Current state; an absent key is atomically initialized to active
    async fn get_or_init(&self) -> Result<ToggleState, GuardrailError>;
    /// Unconditional overwrite
    async fn set(&self, state: ToggleState) -> Result<(), GuardrailError>;
    async fn ping(&self) -> Result<(), GuardrailError>;
}

/// External text-classification endpoint
#[async_trait::async_trait]
pub trait ClassificationOracle: Send + Sync {
    /// Returns the raw, unparsed reply text
    async fn classify(&self, method: &str, url: &str, body: &str) -> Result<String, GuardrailError>;
}

/// Cache of parsed oracle replies keyed by request fingerprint
#[async_trait::async_trait]
pub trait VerdictCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<ParsedReply>;
    async fn put(&self, key: &str, reply: ParsedReply);
}

// Re-export Config from config module
pub use crate::config::Config;

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Error handling + request timeout (tower::timeout) - 408 when exceeded
/// - Tracing middleware (tower-http::trace)
/// - Body size limit (tower-http::limit) - 413 when exceeded
///
/// Dropping a timed-out or disconnected request also drops its in-flight
/// oracle call.
pub fn create_router(app_state: &AppState) -> Router<AppState> {
    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    let router = Router::new()
        .route("/", axum::routing::post(handlers::check_request_handler))
        .route("/status", axum::routing::get(handlers::status_handler))
        .route("/activate", axum::routing::get(handlers::activate_handler))
        .route("/deactivate", axum::routing::get(handlers::deactivate_handler))
        .route("/health", axum::routing::get(handlers::health_handler))
        .route("/metrics", axum::routing::get(handlers::metrics_handler))
        // Bytes extractor has its own 2MB default; align it with the configured limit
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::body_size_limit_layer(body_limit))
        .layer(middleware::tracing_layer());

    // HandleErrorLayer must come BEFORE timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .layer(middleware::timeout_layer(Duration::from_secs(timeout_secs)))
        .into_inner();

    router.layer(middleware_stack)
}
