//! Redis-backed cache for suggestion previews.
//!
//! Best effort: every Redis failure is logged and treated as a miss, so a
//! cache outage never fails a request.

use std::time::Duration;

use redis::Client as RedisClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const KEY_PREFIX: &str = "smart-todo:suggestions";

#[derive(Clone)]
pub struct SuggestionCache {
    client: RedisClient,
    ttl: Duration,
}

impl SuggestionCache {
    pub fn new(client: RedisClient, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    /// SHA-256 over the request parts, so keys survive restarts and
    /// toolchain upgrades.
    pub fn key(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(b"\x1f");
        }
        format!("{KEY_PREFIX}:{:x}", hasher.finalize())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis unavailable, skipping cache read: {e}");
                return None;
            }
        };
        let cached: Option<String> = match redis::cmd("GET").arg(key).query_async(&mut conn).await
        {
            Ok(value) => value,
            Err(e) => {
                warn!("Redis GET failed for {key}: {e}");
                return None;
            }
        };
        let parsed = cached.and_then(|raw| serde_json::from_str(&raw).ok());
        debug!(key, hit = parsed.is_some(), "Suggestion cache lookup");
        parsed
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialise cache entry {key}: {e}");
                return;
            }
        };
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis unavailable, skipping cache write: {e}");
                return;
            }
        };
        let result: redis::RedisResult<()> = redis::cmd("SET")
            .arg(key)
            .arg(raw)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            warn!("Redis SET failed for {key}: {e}");
        }
    }
}
