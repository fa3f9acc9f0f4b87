// Middleware stack for observability and protection

use axum::{body::Body, http::Request};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::handlers::{ORIGINAL_METHOD_HEADER, ORIGINAL_URI_HEADER};

type SubrequestSpan = fn(&Request<Body>) -> Span;

/// Tracing middleware
///
/// One span per request carrying the path plus the proxied method and URI,
/// so every decision log line can be tied back to the original request.
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, SubrequestSpan> {
    TraceLayer::new_for_http().make_span_with(subrequest_span as SubrequestSpan)
}

fn subrequest_span(request: &Request<Body>) -> Span {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        original_method = %header(ORIGINAL_METHOD_HEADER),
        original_uri = %header(ORIGINAL_URI_HEADER),
    )
}

/// Body size limit middleware
///
/// Returns 413 Payload Too Large if exceeded
pub fn body_size_limit_layer(limit_bytes: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(limit_bytes)
}

/// Request timeout middleware
///
/// Must stay longer than the oracle timeout so the oracle bound fires first.
pub fn timeout_layer(timeout: Duration) -> tower::timeout::TimeoutLayer {
    tower::timeout::TimeoutLayer::new(timeout)
}
