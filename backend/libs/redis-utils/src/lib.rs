use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Default bound for a single Redis round trip.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Failure of a bounded Redis operation.
#[derive(Debug, thiserror::Error)]
pub enum RedisOpError {
    #[error("redis operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
}

/// Redis connection pool backed by a single auto-reconnecting manager.
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("failed to parse REDIS_URL connection string")?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        info!("Redis connection manager initialized");

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }

    /// PING under the default command timeout.
    pub async fn ping(&self) -> Result<(), RedisOpError> {
        let manager = self.manager.clone();
        with_timeout(DEFAULT_COMMAND_TIMEOUT, async move {
            let mut conn = manager.lock().await.clone();
            redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
            Ok(())
        })
        .await
    }
}

/// Run a Redis operation under a deadline.
///
/// The future is dropped when the deadline passes, which cancels the
/// in-flight command on this side.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, RedisOpError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(RedisOpError::from),
        Err(_) => Err(RedisOpError::Timeout(duration)),
    }
}
