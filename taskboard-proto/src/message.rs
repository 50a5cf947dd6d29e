//! Plain response bodies shared by several endpoints.

use serde::{Deserialize, Serialize};

/// Notice returned when registration finds an existing user.
pub const USER_ALREADY_EXISTS: &str = "User already exists";

/// Liveness text served at `/`.
pub const LIVENESS_TEXT: &str = "Task Management API Running";

/// A human-readable notice, e.g. `{"message": "User already exists"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// The notice text.
    pub message: String,
}

impl MessageResponse {
    /// The duplicate-registration notice.
    #[must_use]
    pub fn user_already_exists() -> Self {
        Self {
            message: USER_ALREADY_EXISTS.to_string(),
        }
    }
}

/// Body of every error response, `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error description.
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body from any displayable message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
