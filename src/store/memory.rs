//! In-memory state store. Resets on restart, same as the reference
//! implementation's memory-backed storage, but unlike it this one returns
//! an owned clone on `load` rather than a value that aliases the entry
//! still held in the map.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{StateStore, UserKey};
use crate::driver::Session;
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<UserKey, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save(&self, key: &UserKey, session: Session) -> Result<(), StoreError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| StoreError::backend("memory store mutex poisoned"))?;
        guard.insert(key.clone(), session);
        Ok(())
    }

    async fn load(&self, key: &UserKey) -> Result<Option<Session>, StoreError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|_| StoreError::backend("memory store mutex poisoned"))?;
        Ok(guard.get(key).cloned())
    }
}
