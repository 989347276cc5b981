//! Redis service for token revocation and job debouncing flags

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    services::overdue::DispatchGuard,
};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let service = Self { client };
        service.ping().await?;

        Ok(service)
    }

    /// Get a Redis connection
    pub async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;
        Ok(())
    }

    /// Remember a revoked token id until the token would have expired anyway
    pub async fn revoke_token(&self, jti: &str, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.get_connection().await?;

        let key = format!("revoked_token:{}", jti);
        conn.set_ex::<_, _, ()>(&key, "1", ttl_seconds.max(1)).await?;

        Ok(())
    }

    pub async fn is_token_revoked(&self, jti: &str) -> AppResult<bool> {
        let mut conn = self.get_connection().await?;

        let key = format!("revoked_token:{}", jti);
        let exists: bool = conn.exists(&key).await?;

        Ok(exists)
    }

    /// Set `key` with a TTL unless it already exists (`SET NX EX`).
    ///
    /// Returns `true` when this call created the key.
    pub async fn set_if_absent(&self, key: &str, ttl_seconds: u64) -> AppResult<bool> {
        let mut conn = self.get_connection().await?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(reply.is_some())
    }
}

#[async_trait]
impl DispatchGuard for RedisService {
    async fn acquire(&self, key: &str, ttl_seconds: u64) -> AppResult<bool> {
        self.set_if_absent(key, ttl_seconds).await
    }
}
