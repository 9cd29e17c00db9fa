//! Convenient re-exports of commonly used types from docmapper.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmapper::prelude::*;
//! ```

pub use docmapper_core::{
    batch::{BatchDelete, BulkConfig},
    codec::Document,
    engine::{EngineBuilder, IndexEngine},
    error::{DocumentStoreError, DocumentStoreResult},
    field_map::{FieldMap, FieldMapOptions},
    outcome::Outcome,
    page::{Page, PaginationParams},
    record::{FieldDescriptor, FieldKind, Record, RecordExt},
    repository::Repository,
    search::SearchRepository,
    store::{DocumentStore, DynDocumentStore},
};
pub use docmapper_macros::Record;
