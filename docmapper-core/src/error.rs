//! Error types and result types for repository operations.
//!
//! This module provides error handling for every layer of the crate: record shape validation
//! ([`FieldMapError`]), engine transport and decoding failures, and the semantic failures the
//! repository reports as errors instead of outcomes.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Fixed message reported when a write targets a document the engine does not have.
pub const DOCUMENT_NOT_EXISTS: &str = "document ID not exists in the index";

/// Represents all possible errors that can occur when interacting with an index engine.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The record shape could not be turned into a field map.
    ///
    /// This is a configuration error: it is detected when a repository is built and should abort
    /// startup.
    #[error("Invalid record shape: {0}")]
    InvalidShape(#[from] FieldMapError),
    /// Connection or protocol failure while talking to the engine.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The engine answered with a payload that does not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Serialization/deserialization error when converting between records and documents.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An update, save, patch or delete targeted a document the engine rejected.
    #[error("{}", DOCUMENT_NOT_EXISTS)]
    DocumentNotExists,
    /// An update was requested for a record without an identifier.
    #[error("require identifier field '{0}' for update")]
    MissingIdentifier(String),
    /// A patch document does not carry a usable identifier.
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
    /// Error during engine initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Any other failure reported by the engine.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for repository operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// Reasons a record shape cannot produce a field map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldMapError {
    #[error("{0} requires an identifier field")]
    MissingIdentifier(String),
    #[error("{0} has no field named '{1}' to use as identifier")]
    UnknownIdentifier(String, String),
    #[error("{0} declares more than one identifier field: {1:?}")]
    DuplicateIdentifier(String, Vec<String>),
    #[error("identifier field {1} of {0} must be a string")]
    IdentifierNotString(String, String),
    #[error("{0} declares more than one version field: {1:?}")]
    DuplicateVersion(String, Vec<String>),
    #[error("{0} maps more than one field to key '{1}'")]
    DuplicateKey(String, String),
}
