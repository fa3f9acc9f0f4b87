// Core data models for guardrail decisions

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Method assumed when the proxy omits `X-Original-Method`
pub const DEFAULT_METHOD: &str = "GET";

/// Global enforcement switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleState {
    Active,
    Inactive,
}

impl ToggleState {
    /// Decode the stored representation. Anything other than `"1"` is inactive.
    pub fn from_stored(value: &str) -> Self {
        if value == "1" {
            ToggleState::Active
        } else {
            ToggleState::Inactive
        }
    }

    /// Encoded value persisted in the store
    pub fn as_stored(&self) -> &'static str {
        match self {
            ToggleState::Active => "1",
            ToggleState::Inactive => "0",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ToggleState::Active)
    }
}

impl From<bool> for ToggleState {
    fn from(active: bool) -> Self {
        if active {
            ToggleState::Active
        } else {
            ToggleState::Inactive
        }
    }
}

/// Metadata forwarded by the reverse proxy for one subrequest
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub original_url: String,
    pub original_method: String,
    pub raw_body: Bytes,
    pub decoded_body: String,
}

impl RequestContext {
    /// Build a context from the proxy headers and the raw body.
    ///
    /// Missing URI becomes the empty string, missing method becomes `GET`,
    /// and the body is decoded as UTF-8 with invalid sequences replaced.
    pub fn new(original_url: Option<String>, original_method: Option<String>, raw_body: Bytes) -> Self {
        let decoded_body = String::from_utf8_lossy(&raw_body).into_owned();
        Self {
            original_url: original_url.unwrap_or_default(),
            original_method: original_method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            raw_body,
            decoded_body,
        }
    }
}

/// Why a request was let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    ToggleInactive,
    StaticAsset,
    ExcludedPath,
    Clean,
    FailOpen,
}

impl AllowReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowReason::ToggleInactive => "toggle_inactive",
            AllowReason::StaticAsset => "static_asset",
            AllowReason::ExcludedPath => "excluded_path",
            AllowReason::Clean => "clean",
            AllowReason::FailOpen => "fail_open",
        }
    }
}

/// Threat metadata attached to a blocked request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedRequest {
    pub threat_type: String,
    pub payload: String,
    pub target_url: String,
    pub method: String,
}

/// Final allow/block decision for a subrequest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow(AllowReason),
    Block(BlockedRequest),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow(_))
    }

    /// Label used for logs and metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            Verdict::Allow(reason) => reason.as_str(),
            Verdict::Block(_) => "blocked",
        }
    }
}

/// Behaviour when the toggle store or the oracle cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Let the request through and log the failure
    Open,
    /// Surface a 503 so the proxy denies the request
    #[default]
    Closed,
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(FailureMode::Open),
            "closed" => Ok(FailureMode::Closed),
            other => Err(format!("unknown failure mode '{}': must be 'open' or 'closed'", other)),
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::Open => write!(f, "open"),
            FailureMode::Closed => write!(f, "closed"),
        }
    }
}
