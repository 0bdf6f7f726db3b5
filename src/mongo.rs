use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::schemas::Group;
use crate::store::{GroupStore, StoreError, StoreResult};

/// Stores each group as one document of the `Groups` collection.
#[derive(Clone, Debug)]
pub struct MongoStore {
    groups: Collection<Group>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        tracing::info!(database, "connected to MongoDB");
        Ok(Self::from_client(&client, database))
    }

    pub fn from_client(client: &Client, database: &str) -> Self {
        Self {
            groups: client.database(database).collection("Groups"),
        }
    }
}

#[async_trait]
impl GroupStore for MongoStore {
    async fn list(&self) -> StoreResult<Vec<Group>> {
        let cursor = self.groups.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get(&self, id: &str) -> StoreResult<Group> {
        self.groups
            .find_one(doc! { "id": id }, None)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, group: Group) -> StoreResult<()> {
        if self
            .groups
            .find_one(doc! { "id": group.id.as_str() }, None)
            .await?
            .is_some()
        {
            return Err(StoreError::Conflict(group.id));
        }
        self.groups.insert_one(group, None).await?;
        Ok(())
    }

    async fn replace(&self, group: &Group) -> StoreResult<()> {
        let result = self
            .groups
            .replace_one(doc! { "id": group.id.as_str() }, group, None)
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(group.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = self.groups.delete_one(doc! { "id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
