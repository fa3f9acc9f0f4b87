// Requests that never reach the oracle

use crate::core::models::{AllowReason, RequestContext};
use std::collections::HashSet;

/// Static prefix served by the origin without inspection
pub const DEFAULT_STATIC_PREFIX: &str = "/static/";

/// Exclusion rules checked before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRules {
    static_prefix: String,
    excluded_paths: HashSet<String>,
}

impl ExclusionRules {
    pub fn new<I, S>(static_prefix: impl Into<String>, excluded_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            static_prefix: static_prefix.into(),
            excluded_paths: excluded_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the allow reason if the request bypasses classification.
    ///
    /// Static assets are skipped for every method. Excluded paths match
    /// exactly and only for `GET`.
    pub fn check(&self, context: &RequestContext) -> Option<AllowReason> {
        if !self.static_prefix.is_empty() && context.original_url.starts_with(&self.static_prefix) {
            return Some(AllowReason::StaticAsset);
        }

        if context.original_method == "GET" && self.excluded_paths.contains(&context.original_url) {
            return Some(AllowReason::ExcludedPath);
        }

        None
    }

    pub fn static_prefix(&self) -> &str {
        &self.static_prefix
    }

    pub fn excluded_paths(&self) -> &HashSet<String> {
        &self.excluded_paths
    }
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::new(DEFAULT_STATIC_PREFIX, Vec::<String>::new())
    }
}
