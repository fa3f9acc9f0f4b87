// Decision state machine - toggle, exclusions, classification, resolution

use crate::api::{ClassificationOracle, ToggleStore, VerdictCache};
use crate::core::errors::GuardrailError;
use crate::core::models::{AllowReason, BlockedRequest, FailureMode, RequestContext, Verdict};
use crate::engine::exclusions::ExclusionRules;
use crate::engine::reply_parser::{parse_reply, ParsedReply};
use crate::metrics::DecisionMetrics;
use crate::state::verdict_cache::fingerprint;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Orchestrates a single allow/block decision
///
/// Holds only shared handles; no state is carried between requests apart
/// from what lives in the toggle store (and the optional verdict cache).
pub struct DecisionService {
    toggle_store: Arc<dyn ToggleStore + Send + Sync>,
    oracle: Arc<dyn ClassificationOracle + Send + Sync>,
    cache: Arc<dyn VerdictCache + Send + Sync>,
    exclusions: ExclusionRules,
    failure_mode: FailureMode,
    metrics: Arc<DecisionMetrics>,
}

impl DecisionService {
    pub fn new(
        toggle_store: Arc<dyn ToggleStore + Send + Sync>,
        oracle: Arc<dyn ClassificationOracle + Send + Sync>,
        cache: Arc<dyn VerdictCache + Send + Sync>,
        exclusions: ExclusionRules,
        failure_mode: FailureMode,
        metrics: Arc<DecisionMetrics>,
    ) -> Self {
        Self {
            toggle_store,
            oracle,
            cache,
            exclusions,
            failure_mode,
            metrics,
        }
    }

    /// Decide whether the proxied request may proceed
    ///
    /// Order:
    /// 1. Toggle inactive -> allow, oracle untouched
    /// 2. Static asset or excluded GET path -> allow
    /// 3. Classify (cache, then oracle) and parse the reply
    /// 4. Not detected -> allow, detected -> block
    ///
    /// Store and oracle failures follow the configured failure mode.
    pub async fn decide(&self, context: &RequestContext) -> Result<Verdict, GuardrailError> {
        let verdict = match self.evaluate(context).await {
            Ok(verdict) => verdict,
            Err(e) => self.on_dependency_failure(context, e)?,
        };
        self.metrics.record_verdict(&verdict);
        Ok(verdict)
    }

    async fn evaluate(&self, context: &RequestContext) -> Result<Verdict, GuardrailError> {
        let toggle = self.toggle_store.get_or_init().await?;
        if !toggle.is_active() {
            debug!(url = %context.original_url, "Guardrail inactive, bypassing classification");
            return Ok(Verdict::Allow(AllowReason::ToggleInactive));
        }

        if let Some(reason) = self.exclusions.check(context) {
            debug!(url = %context.original_url, reason = reason.as_str(), "Request excluded from classification");
            return Ok(Verdict::Allow(reason));
        }

        let reply = self.classify(context).await?;

        if !reply.detected {
            return Ok(Verdict::Allow(AllowReason::Clean));
        }

        Ok(Verdict::Block(BlockedRequest {
            threat_type: reply.threat_type,
            payload: reply.payload,
            target_url: context.original_url.clone(),
            method: context.original_method.clone(),
        }))
    }

    async fn classify(&self, context: &RequestContext) -> Result<ParsedReply, GuardrailError> {
        let key = fingerprint(&context.original_method, &context.original_url, &context.decoded_body);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(url = %context.original_url, "Verdict cache hit");
            self.metrics.record_cache_hit();
            return Ok(cached);
        }

        let started = Instant::now();
        let result = self
            .oracle
            .classify(&context.original_method, &context.original_url, &context.decoded_body)
            .await;
        let elapsed = started.elapsed();

        let raw = match result {
            Ok(raw) => {
                self.metrics.record_oracle_call("ok", elapsed);
                raw
            }
            Err(e) => {
                let label = match &e {
                    GuardrailError::OracleTimeout(_) => "timeout",
                    _ => "error",
                };
                self.metrics.record_oracle_call(label, elapsed);
                return Err(e);
            }
        };

        let reply = parse_reply(&raw);
        debug!(
            url = %context.original_url,
            detected = reply.detected,
            duration_ms = elapsed.as_millis() as u64,
            "Oracle reply parsed"
        );

        self.cache.put(&key, reply.clone()).await;
        Ok(reply)
    }

    fn on_dependency_failure(
        &self,
        context: &RequestContext,
        err: GuardrailError,
    ) -> Result<Verdict, GuardrailError> {
        match self.failure_mode {
            FailureMode::Open if err.is_dependency_failure() => {
                warn!(
                    error = %err,
                    url = %context.original_url,
                    method = %context.original_method,
                    "Dependency failure - failing open"
                );
                Ok(Verdict::Allow(AllowReason::FailOpen))
            }
            _ => {
                error!(
                    error = %err,
                    url = %context.original_url,
                    method = %context.original_method,
                    "Dependency failure - failing closed"
                );
                self.metrics.record_error();
                Err(err)
            }
        }
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    pub fn exclusions(&self) -> &ExclusionRules {
        &self.exclusions
    }
}
