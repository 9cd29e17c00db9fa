//! Elasticsearch engine for docmapper.
//!
//! This crate implements [`IndexEngine`](docmapper_core::engine::IndexEngine) over the
//! Elasticsearch REST API with `reqwest`. Every repository call becomes one HTTP request:
//!
//! | Engine call | Request |
//! |---|---|
//! | get | `GET /{index}/_doc/{id}` |
//! | exists | `HEAD /{index}/_doc/{id}` |
//! | create | `PUT /{index}/_create/{id}?refresh=true`, or `POST /{index}/_doc?refresh=true` without an id |
//! | update | `POST /{index}/_update/{id}?refresh=true` |
//! | index | `PUT /{index}/_doc/{id}?refresh=true` |
//! | delete | `DELETE /{index}/_doc/{id}` |
//! | search | `POST /{index}/_search` |
//! | bulk delete | `POST /_bulk` with an NDJSON body |
//!
//! To use this engine, enable the `elasticsearch` feature of the facade crate:
//!
//! ```toml
//! [dependencies]
//! docmapper = { version = "x.y.z", features = ["elasticsearch"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docmapper::{engine::EngineBuilder, elasticsearch::ElasticsearchStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ElasticsearchStore::builder("http://localhost:9200")
//!         .credentials("elastic", "changeme")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_elasticsearch;

pub mod config;
pub mod store;

pub use config::ElasticsearchConfig;
pub use store::{ElasticsearchStore, ElasticsearchStoreBuilder};
