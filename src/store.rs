//! Persistence of groups behind the [`GroupStore`] trait.
//!
//! The split and settlement code never touches a store; the HTTP layer loads
//! a group, applies a change to it and writes the whole record back.
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::schemas::Group;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Couldn't find group \"{0}\"")]
    NotFound(String),
    #[error("Group \"{0}\" already exists")]
    Conflict(String),
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Group>>;
    async fn get(&self, id: &str) -> StoreResult<Group>;
    async fn insert(&self, group: Group) -> StoreResult<()>;
    /// Overwrites the stored group with the same id.
    async fn replace(&self, group: &Group) -> StoreResult<()>;
    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// Keeps groups in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    groups: RwLock<Vec<Group>>,
}

impl MemoryStore {
    pub fn with_groups(groups: Vec<Group>) -> Self {
        Self {
            groups: RwLock::new(groups),
        }
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Group>> {
        Ok(self.groups.read().await.clone())
    }

    async fn get(&self, id: &str) -> StoreResult<Group> {
        self.groups
            .read()
            .await
            .iter()
            .find(|group| group.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, group: Group) -> StoreResult<()> {
        let mut groups = self.groups.write().await;
        if groups.iter().any(|existing| existing.id == group.id) {
            return Err(StoreError::Conflict(group.id));
        }
        groups.push(group);
        Ok(())
    }

    async fn replace(&self, group: &Group) -> StoreResult<()> {
        let mut groups = self.groups.write().await;
        let stored = groups
            .iter_mut()
            .find(|existing| existing.id == group.id)
            .ok_or_else(|| StoreError::NotFound(group.id.clone()))?;
        *stored = group.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut groups = self.groups.write().await;
        let before = groups.len();
        groups.retain(|group| group.id != id);
        if groups.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
