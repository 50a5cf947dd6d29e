//! Store-assigned document identifiers.
//!
//! Every task and user document carries an `_id` assigned by the store on
//! insert. On the wire it is the 24-character hex form of a BSON `ObjectId`.

use std::str::FromStr;

use bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of the hex form of an identifier.
pub const DOCUMENT_ID_HEX_LEN: usize = 24;

/// Error returned when a string is not a well-formed document identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid document id {input:?}: expected {DOCUMENT_ID_HEX_LEN} hex characters")]
pub struct InvalidIdError {
    /// The rejected input.
    pub input: String,
}

/// Identifier of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Wraps an existing `ObjectId`.
    #[must_use]
    pub const fn from_object_id(oid: ObjectId) -> Self {
        Self(oid)
    }

    /// Returns the inner `ObjectId`.
    #[must_use]
    pub const fn as_object_id(&self) -> &ObjectId {
        &self.0
    }

    /// Returns the 24-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Parses the hex form of an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdError`] if `input` is not exactly 24 hex characters.
    pub fn parse(input: &str) -> Result<Self, InvalidIdError> {
        ObjectId::parse_str(input)
            .map(Self)
            .map_err(|_| InvalidIdError {
                input: input.to_string(),
            })
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DocumentId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
