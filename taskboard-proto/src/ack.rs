//! Store acknowledgments returned verbatim to API callers.
//!
//! Callers distinguish "nothing happened" from "something happened" by the
//! counts: an update against an unknown id reports `matchedCount: 0`, a delete
//! of an unknown id reports `deletedCount: 0`. Neither is an error.

use serde::{Deserialize, Serialize};

use crate::id::DocumentId;

/// Result of inserting a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    /// Whether the store acknowledged the write.
    pub acknowledged: bool,
    /// Identifier assigned by the store.
    pub inserted_id: DocumentId,
}

impl InsertOneResult {
    /// An acknowledged insert of `id`.
    #[must_use]
    pub const fn acknowledged(id: DocumentId) -> Self {
        Self {
            acknowledged: true,
            inserted_id: id,
        }
    }
}

/// Result of a partial update against a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// Whether the store acknowledged the write.
    pub acknowledged: bool,
    /// Documents matched by the filter (0 or 1).
    pub matched_count: u64,
    /// Documents whose stored fields actually changed (0 or 1).
    pub modified_count: u64,
    /// Always `null`; updates never upsert.
    pub upserted_id: Option<DocumentId>,
    /// Always 0; updates never upsert.
    pub upserted_count: u64,
}

impl UpdateResult {
    /// An acknowledged update with the given counts.
    #[must_use]
    pub const fn acknowledged(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id: None,
            upserted_count: 0,
        }
    }
}

/// Result of deleting a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Whether the store acknowledged the write.
    pub acknowledged: bool,
    /// Documents removed (0 or 1).
    pub deleted_count: u64,
}

impl DeleteResult {
    /// An acknowledged delete with the given count.
    #[must_use]
    pub const fn acknowledged(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}
