use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::sdk::CallOptions;
use crate::store::Store;

/// Entry point to document collections.
#[derive(Debug, Clone)]
pub struct Database {
    store: Store,
}

impl Database {
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Handle to one collection. The SDK is resolved on each call.
    pub fn collection(&self, collection_id: impl Into<String>) -> Collection {
        Collection {
            store: self.store.clone(),
            collection_id: collection_id.into(),
        }
    }
}

/// Document operations on one collection, delegated verbatim to the SDK.
#[derive(Debug, Clone)]
pub struct Collection {
    store: Store,
    collection_id: String,
}

impl Collection {
    pub fn id(&self) -> &str {
        &self.collection_id
    }

    #[instrument(skip_all, fields(collection = %self.collection_id))]
    pub async fn find(&self, query: &Value, options: CallOptions) -> Result<Value> {
        let sdk = self.store.sdk()?;
        let collection = sdk.database(&self.collection_id);
        let found = collection.find(query, options).await;
        found
    }

    #[instrument(skip(self, options), fields(collection = %self.collection_id))]
    pub async fn find_one(&self, id: &str, options: CallOptions) -> Result<Value> {
        let sdk = self.store.sdk()?;
        let collection = sdk.database(&self.collection_id);
        let found = collection.find_one(id, options).await;
        found
    }

    #[instrument(skip_all, fields(collection = %self.collection_id))]
    pub async fn insert(&self, doc: &Value, options: CallOptions) -> Result<Value> {
        let sdk = self.store.sdk()?;
        let collection = sdk.database(&self.collection_id);
        let inserted = collection.insert(doc, options).await;
        inserted
    }

    #[instrument(skip(self, doc, options), fields(collection = %self.collection_id))]
    pub async fn update(&self, id: &str, doc: &Value, options: CallOptions) -> Result<Value> {
        let sdk = self.store.sdk()?;
        let collection = sdk.database(&self.collection_id);
        let updated = collection.update(id, doc, options).await;
        updated
    }

    #[instrument(skip(self, options), fields(collection = %self.collection_id))]
    pub async fn delete(&self, id: &str, options: CallOptions) -> Result<Value> {
        let sdk = self.store.sdk()?;
        let collection = sdk.database(&self.collection_id);
        let deleted = collection.delete(id, options).await;
        deleted
    }

    pub async fn count(&self, query: &Value, options: CallOptions) -> Result<u64> {
        let sdk = self.store.sdk()?;
        let collection = sdk.database(&self.collection_id);
        let counted = collection.count(query, options).await;
        counted
    }
}
