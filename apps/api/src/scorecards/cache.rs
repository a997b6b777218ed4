use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ErrorKind, RedisError, RedisResult};
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::scorecard::Scorecard;
use crate::scorecards::{RepositoryError, ScorecardRepository};

/// Read-through Redis cache in front of another repository.
///
/// Scorecards are read-only for the lifetime of a match, so a short TTL is
/// safe. Redis is best-effort: any cache failure, including a round trip
/// slower than `op_timeout`, falls through to `inner`.
pub struct CachedScorecardRepository<R> {
    inner: R,
    client: redis::Client,
    /// Connected on first use and shared afterwards. A failed connect is
    /// retried on the next lookup.
    connection: OnceCell<ConnectionManager>,
    ttl_secs: u64,
    op_timeout: Duration,
}

impl<R> CachedScorecardRepository<R> {
    pub fn new(inner: R, client: redis::Client, ttl_secs: u64, op_timeout: Duration) -> Self {
        Self {
            inner,
            client,
            connection: OnceCell::new(),
            ttl_secs,
            op_timeout,
        }
    }

    async fn connection(&self) -> RedisResult<ConnectionManager> {
        self.connection
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .cloned()
    }

    async fn bounded<T>(&self, op: impl Future<Output = RedisResult<T>>) -> RedisResult<T> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(RedisError::from((
                ErrorKind::IoError,
                "cache operation timed out",
            ))),
        }
    }

    async fn read(&self, key: &str) -> RedisResult<Option<String>> {
        let op = async {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok::<_, RedisError>(value)
        };
        self.bounded(op).await
    }

    async fn write(&self, key: &str, payload: String) -> RedisResult<()> {
        let op = async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key, payload, self.ttl_secs).await?;
            Ok::<_, RedisError>(())
        };
        self.bounded(op).await
    }
}

fn cache_key(id: Uuid) -> String {
    format!("scorecard:{id}")
}

#[async_trait]
impl<R: ScorecardRepository> ScorecardRepository for CachedScorecardRepository<R> {
    async fn get_scorecard(&self, id: Uuid) -> Result<Option<Scorecard>, RepositoryError> {
        let key = cache_key(id);

        match self.read(&key).await {
            Ok(Some(json)) => match serde_json::from_str::<Scorecard>(&json) {
                Ok(scorecard) => {
                    debug!("Scorecard cache hit: {key}");
                    return Ok(Some(scorecard));
                }
                Err(e) => warn!("Discarding unreadable cached scorecard {key}: {e}"),
            },
            Ok(None) => debug!("Scorecard cache miss: {key}"),
            Err(e) => warn!("Scorecard cache unavailable, reading through: {e}"),
        }

        let scorecard = self.inner.get_scorecard(id).await?;

        if let Some(scorecard) = &scorecard {
            if self.ttl_secs > 0 {
                match serde_json::to_string(scorecard) {
                    Ok(payload) => {
                        if let Err(e) = self.write(&key, payload).await {
                            warn!("Failed to cache scorecard {key}: {e}");
                        }
                    }
                    Err(e) => warn!("Failed to serialize scorecard {key}: {e}"),
                }
            }
        }

        Ok(scorecard)
    }
}
