//! User registration.
//!
//! Registration is idempotent per email. Uniqueness lives in the store: the
//! insert is guarded by the `email` key, and a conflict means the user
//! already exists. There is no separate look-up-then-insert step.

use std::sync::Arc;

use serde_json::Value;
use taskboard_proto::ack::InsertOneResult;

use crate::error::ServiceError;
use crate::store::{Collection, Document, DocumentStore, ID_FIELD, UniqueInsert};

/// Key that identifies a user.
pub const EMAIL_FIELD: &str = "email";

/// Outcome of [`UserService::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A new user record was stored.
    Created(InsertOneResult),
    /// A user with this email already exists; nothing changed.
    AlreadyExists,
}

/// User operations over a shared store handle.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    /// Creates a user service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Stores `fields` as a new user unless one with the same email exists.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidArgument`] when `email` is missing or
    /// not a string, and [`ServiceError::Store`] if the insert fails.
    pub async fn register(&self, mut fields: Document) -> Result<Registration, ServiceError> {
        let Some(Value::String(email)) = fields.get(EMAIL_FIELD) else {
            return Err(ServiceError::InvalidArgument(
                "email is required and must be a string".to_string(),
            ));
        };
        let email = email.clone();
        fields.remove(ID_FIELD);

        match self
            .store
            .insert_unique(Collection::Users, EMAIL_FIELD, fields)
            .await?
        {
            UniqueInsert::Inserted(result) => {
                tracing::info!(user_id = %result.inserted_id, email = %email, "user registered");
                Ok(Registration::Created(result))
            }
            UniqueInsert::Duplicate => {
                tracing::debug!(email = %email, "user already exists");
                Ok(Registration::AlreadyExists)
            }
        }
    }

    /// Returns every user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the store call fails.
    pub async fn list(&self) -> Result<Vec<Document>, ServiceError> {
        Ok(self.store.find_all(Collection::Users).await?)
    }
}
