// Response types for API endpoints

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::core::models::BlockedRequest;

/// Fixed body returned to the proxy for every allowed request
pub const ALLOWED_BODY: &str = r#"{"allowed":true}"#;

/// 200 with the literal allow body
pub fn allowed_response() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        ALLOWED_BODY,
    )
        .into_response()
}

/// 403 body for a blocked request
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BlockedResponse {
    pub blocked: bool,
    pub threat_type: String,
    pub payload: String,
    pub target_url: String,
    pub method: String,
}

impl From<BlockedRequest> for BlockedResponse {
    fn from(blocked: BlockedRequest) -> Self {
        Self {
            blocked: true,
            threat_type: blocked.threat_type,
            payload: blocked.payload,
            target_url: blocked.target_url,
            method: blocked.method,
        }
    }
}

impl IntoResponse for BlockedResponse {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, Json(self)).into_response()
    }
}

/// `GET /status` body
#[derive(Debug, Serialize)]
pub struct ToggleStatusResponse {
    pub active: bool,
}

/// `GET /activate` and `GET /deactivate` body
#[derive(Debug, Serialize)]
pub struct ToggleChangeResponse {
    pub status: &'static str,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub redis: String,
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            request_id: None,
        }
    }

    /// Create from GuardrailError
    pub fn from_guardrail_error(err: crate::core::errors::GuardrailError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: err.user_message(),
            request_id: None,
        }
    }

    /// Create from GuardrailError with request ID
    pub fn from_guardrail_error_with_id(
        err: crate::core::errors::GuardrailError,
        request_id: String,
    ) -> Self {
        Self {
            request_id: Some(request_id),
            ..Self::from_guardrail_error(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            request_id: self.request_id,
        });
        (self.status, body).into_response()
    }
}

impl From<crate::core::errors::GuardrailError> for ApiError {
    fn from(err: crate::core::errors::GuardrailError) -> Self {
        ApiError::from_guardrail_error(err)
    }
}
