//! In-process document store.
//!
//! Holds each collection as an insertion-ordered `Vec` behind a single
//! [`RwLock`]. Used when no database connection string is configured, and by
//! the test suites. Contents are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use taskboard_proto::ack::{DeleteResult, InsertOneResult, UpdateResult};
use taskboard_proto::id::DocumentId;
use tokio::sync::RwLock;

use super::{Collection, Document, DocumentStore, ID_FIELD, StoreResult, UniqueInsert};

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents currently in `collection`.
    pub async fn len(&self, collection: Collection) -> usize {
        let collections = self.collections.read().await;
        collections.get(&collection).map_or(0, Vec::len)
    }
}

fn id_matches(document: &Document, id: &str) -> bool {
    matches!(document.get(ID_FIELD), Some(Value::String(stored)) if stored == id)
}

fn with_new_id(mut document: Document) -> (DocumentId, Document) {
    let id = DocumentId::new();
    document.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
    (id, document)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        let hex = id.to_hex();
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| id_matches(doc, &hex)))
            .cloned())
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> StoreResult<InsertOneResult> {
        let (id, document) = with_new_id(document);
        let mut collections = self.collections.write().await;
        collections.entry(collection).or_default().push(document);
        drop(collections);
        Ok(InsertOneResult::acknowledged(id))
    }

    async fn insert_unique(
        &self,
        collection: Collection,
        key: &'static str,
        document: Document,
    ) -> StoreResult<UniqueInsert> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        // Documents missing the key never conflict, mirroring a sparse index.
        if let Some(value) = document.get(key)
            && docs.iter().any(|doc| doc.get(key) == Some(value))
        {
            return Ok(UniqueInsert::Duplicate);
        }

        let (id, document) = with_new_id(document);
        docs.push(document);
        drop(collections);
        Ok(UniqueInsert::Inserted(InsertOneResult::acknowledged(id)))
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: DocumentId,
        fields: Document,
    ) -> StoreResult<UpdateResult> {
        let hex = id.to_hex();
        let mut collections = self.collections.write().await;
        let Some(target) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| id_matches(doc, &hex)))
        else {
            return Ok(UpdateResult::acknowledged(0, 0));
        };

        let mut modified = false;
        for (field, value) in fields {
            if field == ID_FIELD {
                continue;
            }
            if target.get(&field) != Some(&value) {
                target.insert(field, value);
                modified = true;
            }
        }
        drop(collections);

        Ok(UpdateResult::acknowledged(1, u64::from(modified)))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<DeleteResult> {
        let hex = id.to_hex();
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteResult::acknowledged(0));
        };
        let Some(position) = docs.iter().position(|doc| id_matches(doc, &hex)) else {
            return Ok(DeleteResult::acknowledged(0));
        };
        docs.remove(position);
        drop(collections);
        Ok(DeleteResult::acknowledged(1))
    }
}
