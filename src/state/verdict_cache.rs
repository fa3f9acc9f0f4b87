// Optional cache of parsed oracle replies

use crate::api::VerdictCache;
use crate::engine::reply_parser::ParsedReply;
use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Cache key for a request: hex SHA-256 over method, URL and decoded body.
pub fn fingerprint(method: &str, url: &str, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update([0u8]);
    hasher.update(url.as_bytes());
    hasher.update([0u8]);
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache that never stores anything; every request reaches the oracle
pub struct NoOpVerdictCache;

#[async_trait]
impl VerdictCache for NoOpVerdictCache {
    async fn get(&self, _key: &str) -> Option<ParsedReply> {
        None
    }

    async fn put(&self, _key: &str, _reply: ParsedReply) {}
}

/// Moka-based verdict cache with TTL expiration
///
/// Identical payloads within the TTL reuse the previous classification
/// instead of paying for another oracle round-trip.
pub struct MokaVerdictCache {
    cache: Cache<String, ParsedReply>,
}

impl MokaVerdictCache {
    /// # Parameters
    /// * `ttl_secs` - Time-to-live for cached replies in seconds
    /// * `max_capacity` - Maximum number of cached replies
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .max_capacity(max_capacity)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl VerdictCache for MokaVerdictCache {
    async fn get(&self, key: &str) -> Option<ParsedReply> {
        self.cache.get(key).await
    }

    async fn put(&self, key: &str, reply: ParsedReply) {
        self.cache.insert(key.to_string(), reply).await;
    }
}
