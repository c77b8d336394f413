//! State storage implementation
//!
//! Conversation contexts live either in process memory or in Redis. Contexts
//! never expire: a dialog can stay suspended until the user comes back.

use std::collections::HashMap;
use std::sync::Arc;
use redis::AsyncCommands;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};
use crate::config::{StateBackend, StateConfig};
use crate::utils::errors::Result;
use super::context::ConversationContext;

#[derive(Clone)]
enum Backend {
    Memory(Arc<RwLock<HashMap<i64, ConversationContext>>>),
    Redis {
        connection_manager: redis::aio::ConnectionManager,
        prefix: String,
    },
}

/// Per-user conversation state store
#[derive(Clone)]
pub struct StateStorage {
    backend: Backend,
}

impl StateStorage {
    /// Create the storage selected by configuration
    pub async fn new(config: &StateConfig) -> Result<Self> {
        match config.backend {
            StateBackend::Memory => Ok(Self::in_memory()),
            StateBackend::Redis => {
                let client = redis::Client::open(config.redis_url.as_str())?;
                let connection_manager = redis::aio::ConnectionManager::new(client).await?;
                Ok(Self {
                    backend: Backend::Redis {
                        connection_manager,
                        prefix: config.prefix.clone(),
                    },
                })
            }
        }
    }

    /// Process-local storage
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    /// Save conversation context
    pub async fn save_context(&self, context: &ConversationContext) -> Result<()> {
        debug!(user_id = context.user_id, step = context.state.step_name(), "Saving context");

        match &self.backend {
            Backend::Memory(map) => {
                map.write().await.insert(context.user_id, context.clone());
            }
            Backend::Redis { connection_manager, prefix } => {
                let serialized = serde_json::to_string(context)?;
                let mut conn = connection_manager.clone();
                conn.set::<_, _, ()>(context_key(prefix, context.user_id), serialized)
                    .await
                    .inspect_err(|e| error!(user_id = context.user_id, error = %e, "Failed to save context to Redis"))?;
            }
        }

        Ok(())
    }

    /// Load conversation context
    pub async fn load_context(&self, user_id: i64) -> Result<Option<ConversationContext>> {
        let context = match &self.backend {
            Backend::Memory(map) => map.read().await.get(&user_id).cloned(),
            Backend::Redis { connection_manager, prefix } => {
                let mut conn = connection_manager.clone();
                let serialized: Option<String> = conn.get(context_key(prefix, user_id)).await?;
                match serialized {
                    Some(data) => Some(serde_json::from_str::<ConversationContext>(&data)?),
                    None => None,
                }
            }
        };

        debug!(user_id = user_id, step = context.as_ref().map(|c| c.state.step_name()), "Loaded context");
        Ok(context)
    }

    /// Delete conversation context; returns whether one existed
    pub async fn delete_context(&self, user_id: i64) -> Result<bool> {
        let deleted = match &self.backend {
            Backend::Memory(map) => map.write().await.remove(&user_id).is_some(),
            Backend::Redis { connection_manager, prefix } => {
                let mut conn = connection_manager.clone();
                let deleted: u32 = conn.del(context_key(prefix, user_id)).await?;
                deleted > 0
            }
        };

        debug!(user_id = user_id, deleted = deleted, "Deleted context");
        Ok(deleted)
    }
}

fn context_key(prefix: &str, user_id: i64) -> String {
    format!("{}context:{}", prefix, user_id)
}

/// Per-user locks so one user's events are handled strictly one at a time
#[derive(Clone, Default)]
pub struct UserLocks {
    locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for one user; hold its guard across the whole event
    pub async fn for_user(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConversationState;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let storage = StateStorage::in_memory();
        assert!(storage.load_context(5).await.unwrap().is_none());

        let context = ConversationContext::new(5, ConversationState::AwaitingName);
        storage.save_context(&context).await.unwrap();
        assert_eq!(storage.load_context(5).await.unwrap(), Some(context));

        assert!(storage.delete_context(5).await.unwrap());
        assert!(!storage.delete_context(5).await.unwrap());
        assert!(storage.load_context(5).await.unwrap().is_none());
    }

    #[test]
    fn test_context_key() {
        assert_eq!(context_key("routebuddy:", 42), "routebuddy:context:42");
    }

    #[tokio::test]
    async fn test_user_locks_are_shared_per_user() {
        let locks = UserLocks::new();
        let a = locks.for_user(1).await;
        let b = locks.for_user(1).await;
        let c = locks.for_user(2).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));

        let _guard = a.lock().await;
        assert!(b.try_lock().is_err());
        assert!(c.try_lock().is_ok());
    }
}
