//! MongoDB-backed document store.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use serde_json::Value;
use taskboard_proto::ack::{DeleteResult, InsertOneResult, UpdateResult};
use taskboard_proto::id::DocumentId;

use super::{
    Collection, Document, DocumentStore, ID_FIELD, StoreError, StoreResult, UniqueInsert,
};

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Document store backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connects to `uri`, verifies the deployment answers a ping, and ensures
    /// the unique index on user emails exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the client cannot be created or
    /// the ping fails, and [`StoreError::Backend`] if index creation fails.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::info!(database = %database, "connected to MongoDB");

        let store = Self { db };
        store.ensure_unique_index(Collection::Users, "email").await?;
        Ok(store)
    }

    async fn ensure_unique_index(&self, collection: Collection, key: &str) -> StoreResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { key: 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        self.collection(collection)
            .create_index(index)
            .await
            .map_err(backend)?;
        tracing::debug!(collection = %collection, key = %key, "unique index ensured");
        Ok(())
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<bson::Document> {
        self.db.collection(collection.name())
    }
}

fn backend(err: mongodb::error::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}

/// Converts an API document to BSON, dropping any `_id` so the server assigns
/// one.
fn to_bson(mut document: Document) -> StoreResult<bson::Document> {
    document.remove(ID_FIELD);
    bson::to_document(&document).map_err(|e| StoreError::Conversion(e.to_string()))
}

/// Converts a stored BSON document to its API form, rendering `_id` as a
/// plain hex string.
fn from_bson(mut document: bson::Document) -> StoreResult<Document> {
    let id = document.remove(ID_FIELD);
    let Value::Object(mut fields) = Bson::Document(document).into_relaxed_extjson() else {
        return Err(StoreError::Conversion(
            "stored document did not convert to a JSON object".to_string(),
        ));
    };
    if let Some(id) = id {
        let rendered = match id {
            Bson::ObjectId(oid) => Value::String(oid.to_hex()),
            other => other.into_relaxed_extjson(),
        };
        fields.insert(ID_FIELD.to_string(), rendered);
    }
    Ok(fields)
}

fn inserted_id(id: &Bson) -> StoreResult<DocumentId> {
    id.as_object_id()
        .map(DocumentId::from_object_id)
        .ok_or_else(|| StoreError::Conversion(format!("unexpected inserted id {id}")))
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(doc! {})
            .await
            .map_err(backend)?;
        let documents: Vec<bson::Document> = cursor.try_collect().await.map_err(backend)?;
        documents.into_iter().map(from_bson).collect()
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        self.collection(collection)
            .find_one(doc! { ID_FIELD: *id.as_object_id() })
            .await
            .map_err(backend)?
            .map(from_bson)
            .transpose()
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> StoreResult<InsertOneResult> {
        let result = self
            .collection(collection)
            .insert_one(to_bson(document)?)
            .await
            .map_err(backend)?;
        Ok(InsertOneResult::acknowledged(inserted_id(
            &result.inserted_id,
        )?))
    }

    async fn insert_unique(
        &self,
        collection: Collection,
        key: &'static str,
        document: Document,
    ) -> StoreResult<UniqueInsert> {
        // Uniqueness comes from the index created in `connect`.
        match self
            .collection(collection)
            .insert_one(to_bson(document)?)
            .await
        {
            Ok(result) => Ok(UniqueInsert::Inserted(InsertOneResult::acknowledged(
                inserted_id(&result.inserted_id)?,
            ))),
            Err(e) if is_duplicate_key(&e) => {
                tracing::debug!(collection = %collection, key = %key, "duplicate key on insert");
                Ok(UniqueInsert::Duplicate)
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: DocumentId,
        fields: Document,
    ) -> StoreResult<UpdateResult> {
        let set = to_bson(fields)?;
        let result = self
            .collection(collection)
            .update_one(doc! { ID_FIELD: *id.as_object_id() }, doc! { "$set": set })
            .await
            .map_err(backend)?;
        Ok(UpdateResult::acknowledged(
            result.matched_count,
            result.modified_count,
        ))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<DeleteResult> {
        let result = self
            .collection(collection)
            .delete_one(doc! { ID_FIELD: *id.as_object_id() })
            .await
            .map_err(backend)?;
        Ok(DeleteResult::acknowledged(result.deleted_count))
    }
}
