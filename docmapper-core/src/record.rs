//! Core traits and types for describing a record shape.
//!
//! A record is any serde type that can describe its own fields through a static table of
//! [`FieldDescriptor`]s. The table is what the field map is built from: it names the wire key of
//! every field, which field is the identifier, which (if any) carries the document version and
//! which fields are skipped when empty.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::DocumentStoreResult;

/// Broad value category of a record field.
///
/// Only the identifier check depends on it today: the identifier must be a plain `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    Optional,
    Other,
}

/// Static description of one record field.
///
/// Descriptor tables are usually generated by `#[derive(Record)]`, but they can be written by
/// hand with the `const` builder methods:
///
/// ```ignore
/// const FIELDS: &[FieldDescriptor] = &[
///     FieldDescriptor::new("id", FieldKind::String).identifier(),
///     FieldDescriptor::new("username", FieldKind::String),
///     FieldDescriptor::new("email", FieldKind::Optional).omit_empty(),
///     FieldDescriptor::new("date_of_birth", FieldKind::Optional).key("dateOfBirth"),
/// ];
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// In-memory field name.
    pub name: &'static str,
    /// Wire key override. `None` means the field name is the key.
    pub key: Option<&'static str>,
    pub kind: FieldKind,
    /// Skip the key entirely when the value is an empty string or null.
    pub omit_empty: bool,
    /// Tagged as the record identifier.
    pub identifier: bool,
    /// Tagged as the optimistic-concurrency version.
    pub version: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            key: None,
            kind,
            omit_empty: false,
            identifier: false,
            version: false,
        }
    }

    pub const fn key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    pub const fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    pub const fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub const fn version(mut self) -> Self {
        self.version = true;
        self
    }

    /// Returns the wire key of this field.
    pub fn wire_key(&self) -> &'static str {
        self.key.unwrap_or(self.name)
    }
}

/// Core trait that every record persisted through a repository must implement.
///
/// # Example
///
/// ```ignore
/// use docmapper::Record;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Record)]
/// pub struct User {
///     #[record(id)]
///     pub id: String,
///     pub username: String,
///     #[record(omit_empty)]
///     pub email: Option<String>,
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the field table of this record shape, in declaration order.
    fn fields() -> &'static [FieldDescriptor];

    /// Returns a human readable name for the shape, used in error messages.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Extension trait providing JSON conversion utilities for records.
///
/// This trait is automatically implemented for all types that implement [`Record`].
pub trait RecordExt: Record {
    /// Converts this record to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a record from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}
