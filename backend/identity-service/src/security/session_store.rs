/// Refresh-token session registry
///
/// A refresh token is usable only while its session record exists. Records
/// carry the refresh token's lifetime as TTL and disappear with it.
///
/// ## Keys
///
/// - `auth:session:{user_id}:{refresh_jti}` → `"1"`, `EX` = refresh TTL
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use redis_utils::SharedConnectionManager;
use std::time::{Duration, Instant};
use uuid::Uuid;

const KEY_PREFIX: &str = "auth:session";
const SCAN_BATCH: usize = 100;

fn session_key(user_id: Uuid, refresh_id: &str) -> String {
    format!("{}:{}:{}", KEY_PREFIX, user_id, refresh_id)
}

fn user_pattern(user_id: Uuid) -> String {
    format!("{}:{}:*", KEY_PREFIX, user_id)
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, user_id: Uuid, refresh_id: &str, ttl: Duration) -> Result<()>;

    async fn exists(&self, user_id: Uuid, refresh_id: &str) -> Result<bool>;

    /// Remove one session. Returns `true` only for the caller whose delete
    /// actually removed the record, so concurrent callers can tell who won.
    async fn delete(&self, user_id: Uuid, refresh_id: &str) -> Result<bool>;

    /// Remove every session of `user_id`, returning how many were removed.
    ///
    /// Not atomic across sessions: one saved while this runs may survive.
    async fn delete_all(&self, user_id: Uuid) -> Result<u64>;
}

/// Redis-backed registry shared by every authority replica
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: SharedConnectionManager,
    timeout: Duration,
}

impl RedisSessionStore {
    pub fn new(redis: SharedConnectionManager, timeout: Duration) -> Self {
        Self { redis, timeout }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, user_id: Uuid, refresh_id: &str, ttl: Duration) -> Result<()> {
        let key = session_key(user_id, refresh_id);
        let ttl_secs = ttl.as_secs().max(1);

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

        Ok(())
    }

    async fn exists(&self, user_id: Uuid, refresh_id: &str) -> Result<bool> {
        let key = session_key(user_id, refresh_id);
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

    async fn delete(&self, user_id: Uuid, refresh_id: &str) -> Result<bool> {
        let key = session_key(user_id, refresh_id);
        let mut redis_conn = self.redis.lock().await.clone();
        // DEL is atomic; its count tells concurrent callers apart
        let removed: u64 = redis_utils::with_timeout(self.timeout, async {
            redis::cmd("DEL")
                .arg(&key)
                .query_async(&mut redis_conn)
                .await
        })
        .await?;

        Ok(removed == 1)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64> {
        let pattern = user_pattern(user_id);
        let mut redis_conn = self.redis.lock().await.clone();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) =
                redis_utils::with_timeout(self.timeout, async {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut redis_conn)
                        .await
                })
                .await?;

            if !keys.is_empty() {
                let count: u64 = redis_utils::with_timeout(self.timeout, async {
                    redis::cmd("DEL")
                        .arg(&keys)
                        .query_async(&mut redis_conn)
                        .await
                })
                .await?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::info!(user_id = %user_id, removed, "Deleted all sessions");
        Ok(removed)
    }
}

/// In-process registry with the same expiry and delete semantics
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<(Uuid, String), Instant>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live sessions of a user.
    pub fn count_for(&self, user_id: Uuid) -> usize {
        let now = Instant::now();
        self.sessions
            .iter()
            .filter(|entry| entry.key().0 == user_id && *entry.value() > now)
            .count()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, user_id: Uuid, refresh_id: &str, ttl: Duration) -> Result<()> {
        self.sessions
            .insert((user_id, refresh_id.to_string()), Instant::now() + ttl);
        Ok(())
    }

    async fn exists(&self, user_id: Uuid, refresh_id: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .sessions
            .get(&(user_id, refresh_id.to_string()))
            .map(|expires| *expires > now)
            .unwrap_or(false))
    }

    async fn delete(&self, user_id: Uuid, refresh_id: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .sessions
            .remove(&(user_id, refresh_id.to_string()))
            .map(|(_, expires)| expires > now)
            .unwrap_or(false))
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64> {
        let now = Instant::now();
        let mut removed = 0;
        self.sessions.retain(|(owner, _), expires| {
            if *owner == user_id {
                if *expires > now {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}
