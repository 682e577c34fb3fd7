//! Pluggable session state storage.
//!
//! `load` must hand back a value that is logically independent of anything
//! the store holds internally: mutating the returned [`crate::driver::Session`]
//! must never be visible to a later `load` unless an explicit `save`
//! happened in between.

mod memory;
#[cfg(feature = "redis-store")]
mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis-store")]
pub use redis::RedisStore;

use async_trait::async_trait;

use crate::driver::Session;
use crate::error::StoreError;

/// A per-user key under which a dialog session is stored. Newtype over
/// `String` so adapters can't accidentally pass a display name or a raw
/// platform id where a resolved key is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserKey(pub String);

impl UserKey {
    pub fn new(raw: impl Into<String>) -> Self {
        UserKey(raw.into())
    }
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, key: &UserKey, session: Session) -> Result<(), StoreError>;
    async fn load(&self, key: &UserKey) -> Result<Option<Session>, StoreError>;
}
