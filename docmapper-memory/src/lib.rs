//! In-memory index engine for docmapper.
//!
//! This crate provides a thread-safe, in-memory implementation of the `IndexEngine` trait. It
//! answers with the same envelopes and rejections as the real engine and is meant for
//! development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Engine semantics** - Document versions, shard counts, create conflicts and noop updates
//! - **Query support** - A subset of the query DSL, sorting and pagination
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{Record, prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Record)]
//! pub struct User {
//!     #[record(id)]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(engine);
//!     let users = store.repository::<User>("users")?;
//!
//!     users.create(&User { id: "u1".to_string(), name: "Alice".to_string() }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
