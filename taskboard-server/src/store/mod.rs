//! Document store adapter.
//!
//! [`DocumentStore`] is a thin pass-through over a schema-flexible document
//! database with two collections. Documents are JSON objects; the store owns
//! the `_id` field and assigns it on insert. Two backends are provided:
//! [`MemoryStore`] for local runs and tests, and [`MongoStore`] for MongoDB.

mod memory;
mod mongo;

use async_trait::async_trait;
use serde_json::{Map, Value};
use taskboard_proto::ack::{DeleteResult, InsertOneResult, UpdateResult};
use taskboard_proto::id::DocumentId;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A stored record: a JSON object whose `_id` is set by the store.
pub type Document = Map<String, Value>;

/// Name of the identifier field on every stored document.
pub const ID_FIELD: &str = "_id";

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The two logical collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Registered users, unique by `email`.
    Users,
    /// Tasks.
    Tasks,
}

impl Collection {
    /// Collection name in the backing database.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Tasks => "Task",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of an insert guarded by a unique key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueInsert {
    /// No document held the key; the new one was stored.
    Inserted(InsertOneResult),
    /// A document with the same key value already exists; nothing changed.
    Duplicate,
}

/// Errors raised by store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Could not reach the database.
    #[error("store connection failed: {0}")]
    Connection(String),
    /// A document could not be converted to or from the backend format.
    #[error("document conversion failed: {0}")]
    Conversion(String),
    /// The backend rejected or failed the operation.
    #[error("store operation failed: {0}")]
    Backend(String),
}

/// Persistence contract shared by all backends.
///
/// All writes are single-document and atomic per document; nothing spans
/// documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every document in `collection` in store-default order.
    async fn find_all(&self, collection: Collection) -> StoreResult<Vec<Document>>;

    /// Returns the document with `id`, if any.
    async fn find_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>>;

    /// Inserts `document`, assigning a fresh `_id`.
    ///
    /// Any `_id` already present in `document` is replaced.
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> StoreResult<InsertOneResult>;

    /// Inserts `document` unless another document has the same value at
    /// `key`. The check and the insert are a single atomic step.
    async fn insert_unique(
        &self,
        collection: Collection,
        key: &'static str,
        document: Document,
    ) -> StoreResult<UniqueInsert>;

    /// Merges `fields` into the document with `id`, overwriting only the
    /// supplied fields.
    async fn update_one(
        &self,
        collection: Collection,
        id: DocumentId,
        fields: Document,
    ) -> StoreResult<UpdateResult>;

    /// Removes the document with `id`.
    async fn delete_one(&self, collection: Collection, id: DocumentId)
    -> StoreResult<DeleteResult>;
}
