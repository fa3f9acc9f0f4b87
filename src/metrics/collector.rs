use crate::core::errors::GuardrailError;
use crate::core::models::Verdict;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Prometheus counters for decisions and oracle traffic.
///
/// Each collector owns its registry so that independent instances (tests,
/// multiple routers) never collide on registration.
pub struct DecisionMetrics {
    registry: Registry,
    decisions: IntCounterVec,
    oracle_calls: IntCounterVec,
    oracle_latency: Histogram,
}

impl DecisionMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new("guardrail_decisions_total", "Subrequest decisions by outcome"),
            &["outcome"],
        )?;
        let oracle_calls = IntCounterVec::new(
            Opts::new("guardrail_oracle_calls_total", "Classification oracle calls by result"),
            &["result"],
        )?;
        let oracle_latency = Histogram::with_opts(HistogramOpts::new(
            "guardrail_oracle_latency_seconds",
            "Classification oracle round-trip latency",
        ))?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(oracle_calls.clone()))?;
        registry.register(Box::new(oracle_latency.clone()))?;

        Ok(Self {
            registry,
            decisions,
            oracle_calls,
            oracle_latency,
        })
    }

    pub fn record_verdict(&self, verdict: &Verdict) {
        self.decisions.with_label_values(&[verdict.outcome()]).inc();
    }

    /// Decision aborted by a dependency failure (fail-closed)
    pub fn record_error(&self) {
        self.decisions.with_label_values(&["error"]).inc();
    }

    pub fn record_oracle_call(&self, result: &str, elapsed: Duration) {
        self.oracle_calls.with_label_values(&[result]).inc();
        self.oracle_latency.observe(elapsed.as_secs_f64());
    }

    pub fn record_cache_hit(&self) {
        self.oracle_calls.with_label_values(&["cache_hit"]).inc();
    }

    pub fn decision_count(&self, outcome: &str) -> u64 {
        self.decisions.with_label_values(&[outcome]).get()
    }

    pub fn oracle_call_count(&self, result: &str) -> u64 {
        self.oracle_calls.with_label_values(&[result]).get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String, GuardrailError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| GuardrailError::ConfigurationError(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| GuardrailError::ConfigurationError(format!("Metrics are not UTF-8: {}", e)))
    }
}
