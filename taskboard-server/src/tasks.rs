//! Task service: persist, then notify.
//!
//! Every successful mutation is followed by exactly one
//! [`ServerEvent::TasksUpdated`] on the injected [`Notifier`]; a failed one
//! publishes nothing. Identifiers are validated before any store call.

use std::sync::Arc;

use serde_json::Value;
use taskboard_proto::ack::{DeleteResult, InsertOneResult, UpdateResult};
use taskboard_proto::event::ServerEvent;
use taskboard_proto::id::DocumentId;
use taskboard_proto::reorder::ReorderEntry;

use crate::error::ServiceError;
use crate::notify::Notifier;
use crate::store::{Collection, Document, DocumentStore, ID_FIELD};

/// Field stamped with the creation time on insert.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Field written by reorder.
pub const ORDER_FIELD: &str = "order";

/// A reorder batch stopped at a failing entry.
///
/// Entries before `failed_id` were committed and are not rolled back; entries
/// after it were never attempted.
#[derive(Debug, thiserror::Error)]
#[error("reorder stopped at {failed_id} after {applied} update(s): {source}")]
pub struct ReorderError {
    /// Entries committed before the failure.
    pub applied: usize,
    /// Raw id of the entry that failed.
    pub failed_id: String,
    /// Why it failed.
    #[source]
    pub source: ServiceError,
}

/// Outcome of a fully applied reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderSummary {
    /// Number of entries applied.
    pub applied: usize,
}

/// Task operations over a shared store handle and notifier.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    stamp_timestamp: bool,
}

impl TaskService {
    /// Creates a service that stamps a creation timestamp on new tasks.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            stamp_timestamp: true,
        }
    }

    /// Enables or disables the creation timestamp.
    #[must_use]
    pub const fn with_timestamps(mut self, enabled: bool) -> Self {
        self.stamp_timestamp = enabled;
        self
    }

    /// Returns every task in store order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the store call fails.
    pub async fn list(&self) -> Result<Vec<Document>, ServiceError> {
        Ok(self.store.find_all(Collection::Tasks).await?)
    }

    /// Looks up one task.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidId`] for a malformed id and
    /// [`ServiceError::Store`] if the store call fails.
    pub async fn get(&self, id: &str) -> Result<Option<Document>, ServiceError> {
        let id = DocumentId::parse(id)?;
        Ok(self.store.find_by_id(Collection::Tasks, id).await?)
    }

    /// Stores a new task built from `fields`.
    ///
    /// Caller-supplied `_id` is discarded. When timestamps are enabled and
    /// `fields` has no `timestamp`, the current UTC time is added.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the insert fails.
    pub async fn create(&self, mut fields: Document) -> Result<InsertOneResult, ServiceError> {
        fields.remove(ID_FIELD);
        if self.stamp_timestamp && !fields.contains_key(TIMESTAMP_FIELD) {
            fields.insert(
                TIMESTAMP_FIELD.to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        let result = self.store.insert_one(Collection::Tasks, fields).await?;
        tracing::info!(task_id = %result.inserted_id, "task created");
        self.broadcast();
        Ok(result)
    }

    /// Merges `fields` into the task `id`.
    ///
    /// An id that matches nothing is not an error: the counts are zero. The
    /// change hint is still published.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidId`] for a malformed id and
    /// [`ServiceError::Store`] if the update fails.
    pub async fn update(
        &self,
        id: &str,
        mut fields: Document,
    ) -> Result<UpdateResult, ServiceError> {
        let id = DocumentId::parse(id)?;
        fields.remove(ID_FIELD);

        let result = self.store.update_one(Collection::Tasks, id, fields).await?;
        tracing::info!(
            task_id = %id,
            matched = result.matched_count,
            modified = result.modified_count,
            "task updated"
        );
        self.broadcast();
        Ok(result)
    }

    /// Removes the task `id`. Deleting an unknown id reports a zero count.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidId`] for a malformed id and
    /// [`ServiceError::Store`] if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<DeleteResult, ServiceError> {
        let id = DocumentId::parse(id)?;

        let result = self.store.delete_one(Collection::Tasks, id).await?;
        tracing::info!(task_id = %id, deleted = result.deleted_count, "task deleted");
        self.broadcast();
        Ok(result)
    }

    /// Applies `entries` one at a time, setting only `order` on each task.
    ///
    /// Runs sequentially and stops at the first failure. Publishes a single
    /// change hint only when every entry succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`ReorderError`] naming the failing entry and how many
    /// entries were committed before it.
    pub async fn reorder(
        &self,
        category: Option<&str>,
        entries: Vec<ReorderEntry>,
    ) -> Result<ReorderSummary, ReorderError> {
        let total = entries.len();
        let mut applied = 0;

        for entry in entries {
            if let Err(source) = self.apply_order(&entry).await {
                tracing::warn!(
                    category = category.unwrap_or_default(),
                    task_id = %entry.id,
                    applied,
                    total,
                    error = %source,
                    "reorder stopped"
                );
                return Err(ReorderError {
                    applied,
                    failed_id: entry.id,
                    source,
                });
            }
            applied += 1;
        }

        tracing::info!(
            category = category.unwrap_or_default(),
            applied,
            "tasks reordered"
        );
        self.broadcast();
        Ok(ReorderSummary { applied })
    }

    async fn apply_order(&self, entry: &ReorderEntry) -> Result<UpdateResult, ServiceError> {
        let id = DocumentId::parse(&entry.id)?;
        let mut fields = Document::new();
        fields.insert(ORDER_FIELD.to_string(), Value::Number(entry.order.clone()));
        Ok(self.store.update_one(Collection::Tasks, id, fields).await?)
    }

    fn broadcast(&self) {
        self.notifier.notify(&ServerEvent::TasksUpdated);
    }
}
