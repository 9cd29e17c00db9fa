//! A mapping layer persisting plain records in a document-oriented search/index engine.
//!
//! This crate is the core of the docmapper project and provides:
//!
//! - **Record shapes** ([`record`]) - The static field table describing how a record is stored
//! - **Field maps** ([`field_map`]) - Validated per-shape mapping of fields to wire keys
//! - **Document codec** ([`codec`]) - Conversion between records and wire documents
//! - **Engine abstraction** ([`engine`]) - Traits for implementing different index engines
//! - **Wire envelopes** ([`envelope`]) - Response types shared by every engine
//! - **Repositories** ([`repository`]) - CRUD operations for one record shape in one index
//! - **Search** ([`search`], [`query`]) - Filtered, sorted and paginated searches
//! - **Bulk deletes** ([`batch`]) - Buffered bulk deletion with per-item failure reporting
//! - **Document store** ([`store`]) - Entry point handing out repositories
//! - **Error handling** ([`error`]) - Error types and result types
//! - **Pagination** ([`page`]) - Result pages and page-number parameters
//!
//! # Example
//!
//! ```ignore
//! use docmapper_core::record::{FieldDescriptor, FieldKind, Record};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl Record for User {
//!     fn fields() -> &'static [FieldDescriptor] {
//!         const FIELDS: &[FieldDescriptor] = &[
//!             FieldDescriptor::new("id", FieldKind::String).identifier(),
//!             FieldDescriptor::new("name", FieldKind::String),
//!         ];
//!         FIELDS
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_core;

pub mod batch;
pub mod codec;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod field_map;
pub mod outcome;
pub mod page;
pub mod query;
pub mod record;
pub mod repository;
pub mod search;
pub mod store;
