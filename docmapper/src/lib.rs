//! Main docmapper crate providing typed repositories over a JSON index engine.
//!
//! This crate is the primary entry point for users of docmapper. It re-exports the core types
//! from the sub-crates and gives access to the available engines.
//!
//! # Features
//!
//! - **Typed records** - Describe a record shape with serde and `#[derive(Record)]`
//! - **CRUD repositories** - One engine request per call, with create/update/save/patch/delete
//!   outcomes mapped to plain numbers
//! - **Search** - Caller-built queries, sort expressions and paging with the engine's total
//! - **Batch delete** - Bulk requests reporting the ids the engine failed
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{prelude::*, memory::InMemoryStore};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Record)]
//! pub struct User {
//!     #[record(id)]
//!     pub id: String,
//!     pub username: String,
//!     #[record(omit_empty)]
//!     pub email: Option<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.repository::<User>("users")?;
//!
//!     let user = User { id: "u1".to_string(), username: "tony".to_string(), email: None };
//!     assert_eq!(users.create(&user).await?, Outcome(1));
//!
//!     let search = users.into_search(
//!         |name: &String| json!({ "match": { "username": name } }),
//!         |_: &String| "username".to_string(),
//!     );
//!     let page = search.search(&"tony".to_string(), 10, 0).await?;
//!     println!("{} of {} users", page.len(), page.total);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A typed `DocumentStore` converts into a store over a boxed engine with
//! [`into_dyn`](store::DocumentStore::into_dyn), for engines chosen at runtime:
//!
//! ```ignore
//! let store = DocumentStore::new(InMemoryStore::new()).into_dyn();
//! let users = store.repository::<User>("users")?;
//! ```
//!
//! # Engines
//!
//! - [`memory`] - In-process engine for development and testing
//! - `elasticsearch` - Elasticsearch REST engine (requires the `elasticsearch` feature)

#[allow(unused_extern_crates)]
extern crate self as docmapper;

pub mod prelude;

pub use docmapper_core::{
    batch, codec, engine, envelope, error, field_map, outcome, page, query, record, repository,
    search, store,
};
pub use docmapper_macros::Record;

// Patch documents are plain JSON maps.
pub use serde_json;

/// In-memory engine implementation.
pub mod memory {
    pub use docmapper_memory::{InMemoryStore, InMemoryStoreBuilder, evaluator};
}

/// Elasticsearch engine implementation.
///
/// This module is only available when the `elasticsearch` feature is enabled.
#[cfg(feature = "elasticsearch")]
pub mod elasticsearch {
    pub use docmapper_elasticsearch::{
        ElasticsearchConfig, ElasticsearchStore, ElasticsearchStoreBuilder,
    };
}
