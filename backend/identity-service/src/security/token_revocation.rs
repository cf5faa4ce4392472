/// Access token revocation registry
///
/// Records token ids (`jti`) invalidated before their natural expiry. Each
/// record expires with the token it revokes, so the registry never outgrows
/// the set of still-live tokens.
///
/// ## Keys
///
/// - `auth:revoked:{jti}` → `"1"`, `EX` = remaining token lifetime
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use redis_utils::SharedConnectionManager;
use std::time::{Duration, Instant};

const KEY_PREFIX: &str = "auth:revoked";

fn revocation_key(token_id: &str) -> String {
    format!("{}:{}", KEY_PREFIX, token_id)
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark `token_id` revoked for `ttl`. A zero ttl stores nothing.
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<()>;

    async fn is_revoked(&self, token_id: &str) -> Result<bool>;
}

/// Redis-backed registry shared by every authority replica
#[derive(Clone)]
pub struct RedisRevocationStore {
    redis: SharedConnectionManager,
    timeout: Duration,
}

impl RedisRevocationStore {
    pub fn new(redis: SharedConnectionManager, timeout: Duration) -> Self {
        Self { redis, timeout }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<()> {
        let ttl_secs = ttl.as_secs();
        if ttl_secs == 0 {
            return Ok(());
        }

        let key = revocation_key(token_id);
        let mut redis_conn = self.redis.lock().await.clone();
        redis_utils::with_timeout(self.timeout, async {
            redis::cmd("SET")
                .arg(&key)
                .arg("1")
                .arg("EX")
                .arg(ttl_secs)
                .query_async::<_, ()>(&mut redis_conn)
                .await
        })
        .await?;

        tracing::info!(
            token_id = %token_id,
            ttl_secs,
            "Token revoked"
        );
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool> {
        let key = revocation_key(token_id);
        let mut redis_conn = self.redis.lock().await.clone();
        let exists: bool = redis_utils::with_timeout(self.timeout, async {
            redis::cmd("EXISTS")
                .arg(&key)
                .query_async(&mut redis_conn)
                .await
        })
        .await?;

        Ok(exists)
    }
}

/// In-process registry with the same expiry semantics
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: DashMap<String, Instant>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.entries
            .insert(token_id.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool> {
        let now = Instant::now();
        let live = self
            .entries
            .get(token_id)
            .map(|expires| *expires > now)
            .unwrap_or(false);
        if !live {
            self.entries.remove_if(token_id, |_, expires| *expires <= now);
        }
        Ok(live)
    }
}

/// Lets co-located perimeter guards consult the registry directly.
#[async_trait]
impl actix_middleware::RevocationCheck for RedisRevocationStore {
    async fn is_revoked(&self, token_id: &str) -> std::result::Result<bool, String> {
        RevocationStore::is_revoked(self, token_id)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl actix_middleware::RevocationCheck for InMemoryRevocationStore {
    async fn is_revoked(&self, token_id: &str) -> std::result::Result<bool, String> {
        RevocationStore::is_revoked(self, token_id)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(revocation_key("abc"), "auth:revoked:abc");
    }

    #[tokio::test]
    async fn test_in_memory_revocation_expires() {
        let store = InMemoryRevocationStore::new();
        store
            .revoke("jti-1", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(store.is_revoked("jti-1").await.unwrap());
        assert!(!store.is_revoked("jti-2").await.unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!store.is_revoked("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_stores_nothing() {
        let store = InMemoryRevocationStore::new();
        store.revoke("jti-1", Duration::ZERO).await.unwrap();
        assert!(!store.is_revoked("jti-1").await.unwrap());
    }
}
