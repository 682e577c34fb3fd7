//! External KV-backed state store, behind the `redis-store` feature.
//!
//! Sessions are serialized as JSON and stored under a fixed key prefix so a
//! single Redis instance can be shared with unrelated data.

use async_trait::async_trait;
use redis::AsyncCommands;

use super::{StateStore, UserKey};
use crate::driver::Session;
use crate::error::StoreError;

const KEY_PREFIX: &str = "scenario_engine:session:";

pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(|e| StoreError::backend(e.to_string()))?;
        Ok(RedisStore { client })
    }

    fn key_for(key: &UserKey) -> String {
        format!("{KEY_PREFIX}{}", key.0)
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn save(&self, key: &UserKey, session: Session) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?;
        let payload = serde_json::to_string(&session)?;
        conn.set::<_, _, ()>(Self::key_for(key), payload)
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, key: &UserKey) -> Result<Option<Session>, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?;
        let raw: Option<String> = conn
            .get(Self::key_for(key))
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?;
        match raw {
            None => Ok(None),
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
        }
    }
}
