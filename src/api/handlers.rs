// Request handlers for API endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, error, info, warn};

use crate::api::responses::{
    allowed_response, ApiError, BlockedResponse, HealthResponse, ToggleChangeResponse,
    ToggleStatusResponse,
};
use crate::api::AppState;
use crate::core::models::{RequestContext, ToggleState, Verdict};

/// Header carrying the original request URI
pub const ORIGINAL_URI_HEADER: &str = "x-original-uri";

/// Header carrying the original request method
pub const ORIGINAL_METHOD_HEADER: &str = "x-original-method";

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Auth-subrequest decision endpoint
///
/// POST /
///
/// Request flow:
/// 1. Build the request context from `X-Original-URI`, `X-Original-Method` and the body
/// 2. Run the decision service
/// 3. Allowed -> 200 `{"allowed":true}`, blocked -> 403 with threat details
/// 4. Dependency failure under fail-closed -> 503
pub async fn check_request_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = request_id(&headers);
    let context = RequestContext::new(
        header_string(&headers, ORIGINAL_URI_HEADER),
        header_string(&headers, ORIGINAL_METHOD_HEADER),
        body,
    );

    let started = std::time::Instant::now();
    let verdict = app_state
        .decision_service
        .decide(&context)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                request_id = %request_id,
                method = %context.original_method,
                url = %context.original_url,
                "Decision failed"
            );
            ApiError::from_guardrail_error_with_id(e, request_id.clone())
        })?;
    let duration_ms = started.elapsed().as_millis() as u64;

    match verdict {
        Verdict::Allow(reason) => {
            debug!(
                request_id = %request_id,
                method = %context.original_method,
                url = %context.original_url,
                outcome = reason.as_str(),
                duration_ms,
                "Request allowed"
            );
            Ok(allowed_response())
        }
        Verdict::Block(blocked) => {
            warn!(
                request_id = %request_id,
                method = %blocked.method,
                url = %blocked.target_url,
                threat_type = %blocked.threat_type,
                duration_ms,
                "Request blocked"
            );
            Ok(BlockedResponse::from(blocked).into_response())
        }
    }
}

/// GET /status
///
/// Reads the toggle, initializing it to active if it has never been set.
pub async fn status_handler(
    State(app_state): State<AppState>,
) -> Result<Json<ToggleStatusResponse>, ApiError> {
    let state = app_state.toggle_store.get_or_init().await.map_err(|e| {
        error!(error = %e, "Failed to read toggle");
        ApiError::from(e)
    })?;

    Ok(Json(ToggleStatusResponse {
        active: state.is_active(),
    }))
}

/// GET /activate
pub async fn activate_handler(
    State(app_state): State<AppState>,
) -> Result<Json<ToggleChangeResponse>, ApiError> {
    set_toggle(&app_state, ToggleState::Active).await?;
    Ok(Json(ToggleChangeResponse { status: "activated" }))
}

/// GET /deactivate
pub async fn deactivate_handler(
    State(app_state): State<AppState>,
) -> Result<Json<ToggleChangeResponse>, ApiError> {
    set_toggle(&app_state, ToggleState::Inactive).await?;
    Ok(Json(ToggleChangeResponse { status: "deactivated" }))
}

async fn set_toggle(app_state: &AppState, state: ToggleState) -> Result<(), ApiError> {
    app_state.toggle_store.set(state).await.map_err(|e| {
        error!(error = %e, active = state.is_active(), "Failed to write toggle");
        ApiError::from(e)
    })?;
    info!(active = state.is_active(), "Guardrail toggle changed");
    Ok(())
}

/// Health check handler
///
/// GET /health
///
/// Always 200 while the process serves; Redis trouble is reported as
/// "slow" rather than failing the probe.
pub async fn health_handler(
    State(app_state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let redis_status = match tokio::time::timeout(
        std::time::Duration::from_millis(500),
        app_state.toggle_store.ping(),
    )
    .await
    {
        Ok(Ok(_)) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Redis ping failed");
            format!("slow: {}", e.user_message())
        }
        Err(_) => {
            debug!("Redis ping timed out in health check");
            "slow: timeout".to_string()
        }
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        redis: redis_status,
    }))
}

/// Metrics handler
///
/// GET /metrics
///
/// Returns Prometheus metrics in text format
pub async fn metrics_handler(State(app_state): State<AppState>) -> Result<Response, ApiError> {
    let body = app_state.metrics.render()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
