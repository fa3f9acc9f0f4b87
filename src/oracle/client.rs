// HTTP client for the text-generation classification oracle

use crate::api::ClassificationOracle;
use crate::core::errors::GuardrailError;
use crate::core::resilience::{create_circuit_breaker, execute_with_cb, OracleCircuitBreaker};
use crate::oracle::prompt::{build_input, SQLI_INSTRUCTIONS};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Responses API request body
#[derive(Debug, Serialize)]
pub(crate) struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

/// Subset of the Responses API reply we read
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponsesReply {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

impl ResponsesReply {
    /// Aggregate reply text: `output_text` if present, else every
    /// `output_text` content part joined in order.
    pub(crate) fn text(&self) -> String {
        if let Some(text) = self.output_text.as_ref().filter(|t| !t.is_empty()) {
            return text.clone();
        }

        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Oracle client speaking the OpenAI Responses API
///
/// Uses connection pooling, a hard request timeout and a circuit breaker.
/// No retries: every classification is a single attempt.
pub struct OpenAiOracleClient {
    http_client: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    default_timeout: Duration,
    cb: OracleCircuitBreaker,
}

impl OpenAiOracleClient {
    /// Create a new oracle client
    ///
    /// # Arguments
    /// * `base_url` - API base, e.g. `https://api.openai.com/v1`
    /// * `api_key` - Bearer token
    /// * `model` - Model identifier
    /// * `timeout_secs` - Whole-request timeout in seconds
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, GuardrailError> {
        let timeout = Duration::from_secs(timeout_secs);
        let connect_timeout = Duration::from_secs(2); // Fail fast on connection

        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| GuardrailError::ConfigurationError(format!(
                "Failed to create HTTP client: {}", e
            )))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/responses", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            default_timeout: timeout,
            cb: create_circuit_breaker(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.default_timeout
    }

    async fn classify_internal(&self, url: &str, body: &str) -> Result<String, GuardrailError> {
        let request = ResponsesRequest {
            model: &self.model,
            instructions: SQLI_INSTRUCTIONS,
            input: build_input(url, body),
        };

        debug!(endpoint = %self.endpoint, model = %self.model, url = %url, "Sending classification request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GuardrailError::OracleTimeout(self.default_timeout.as_secs())
                } else if e.is_connect() {
                    GuardrailError::OracleUnavailable("Connection failed".to_string())
                } else {
                    GuardrailError::OracleUnavailable(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                endpoint = %self.endpoint,
                error = %error_text,
                "Oracle returned HTTP error"
            );
            return Err(GuardrailError::OracleUnavailable(format!("Oracle error: HTTP {}", status)));
        }

        let reply: ResponsesReply = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GuardrailError::OracleTimeout(self.default_timeout.as_secs())
            } else {
                error!(error = %e, endpoint = %self.endpoint, "Failed to decode oracle response");
                GuardrailError::OracleUnavailable(format!("Failed to parse response: {}", e))
            }
        })?;

        let text = reply.text();
        if text.is_empty() {
            warn!(endpoint = %self.endpoint, "Oracle response carried no output text");
        }
        Ok(text)
    }
}

#[async_trait]
impl ClassificationOracle for OpenAiOracleClient {
    async fn classify(&self, method: &str, url: &str, body: &str) -> Result<String, GuardrailError> {
        debug!(method = %method, url = %url, "Classifying request");
        execute_with_cb(&self.cb, || self.classify_internal(url, body)).await
    }
}
