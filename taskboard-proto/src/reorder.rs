//! Reorder batch request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Body of `PUT /reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    /// Category the batch was produced for. Informational only.
    #[serde(default)]
    pub category: Option<String>,
    /// Positions to apply, in application order.
    pub tasks: Vec<ReorderEntry>,
}

/// One `(id, order)` pair of a reorder batch.
///
/// The id is kept as the raw string so a malformed entry only fails when its
/// turn comes; earlier entries are still applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry {
    /// Hex identifier of the task to move.
    #[serde(rename = "_id")]
    pub id: String,
    /// New position within the category.
    pub order: Number,
}

/// Response body of `PUT /reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReorderResponse {
    /// Every entry was applied.
    Success {
        /// Always `true`.
        success: bool,
    },
    /// An entry failed; entries before it stay applied.
    Failure {
        /// Why the failing entry was rejected.
        error: String,
        /// Number of entries committed before the failure.
        applied: usize,
    },
}

impl ReorderResponse {
    /// The full-success body, `{"success": true}`.
    #[must_use]
    pub const fn success() -> Self {
        Self::Success { success: true }
    }
}
