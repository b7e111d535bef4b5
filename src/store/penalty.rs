//! Penalty records shared with the rate-limiting layer (Redis).

use async_trait::async_trait;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::config::{Config as FredConfig, ReconnectPolicy};

use super::errors::StoreError;

/// Write-only view of the shared penalty store.
#[async_trait]
pub trait PenaltyStore: Send + Sync {
    /// Record a penalty under `key` with the given lifetime.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;
}

/// Redis-backed penalty store.
pub struct RedisPenaltyStore {
    pool: fred::clients::Pool,
}

impl RedisPenaltyStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let config = FredConfig::from_url(url)?;

        let mut builder = fred::types::Builder::from_config(config);
        builder.set_policy(ReconnectPolicy::new_exponential(0, 100, 30_000, 2));

        let pool = builder.build_pool(3)?;
        pool.init().await?;

        tracing::info!("Penalty store connected");
        Ok(Self { pool })
    }
}

#[async_trait]
impl PenaltyStore for RedisPenaltyStore {
    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let _: () = self
            .pool
            .set(key, value, Some(fred::types::Expiration::EX(ttl_secs as i64)), None, false)
            .await
            .map_err(|e| StoreError::Other(anyhow::Error::from(e)))?;
        Ok(())
    }
}

#[cfg(test)]
pub use mock::MockPenaltyStore;
