//! Index engine abstraction.
//!
//! This module defines the traits that abstract over the search/index engine a repository talks
//! to, so the same repositories work against the HTTP engine, the in-memory engine, or anything
//! else speaking the same document model.
//!
//! # Traits
//!
//! - [`IndexEngine`]: The core trait for engines
//! - [`DynIndexEngine`]: Object-safe counterpart for dynamic dispatch
//! - [`EngineBuilder`]: Factory trait for creating engine instances
//!
//! # Examples
//!
//! ```ignore
//! use docmapper::engine::IndexEngine;
//! use serde_json::json;
//!
//! let engine = MyEngine::new();
//!
//! let body = json!({ "username": "tony" });
//! let reply = engine.create_document("users", Some("u1"), body.as_object().cloned().unwrap()).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::{any::Any, fmt::Debug, sync::Arc};

use crate::{
    codec::Document,
    envelope::{BulkResponse, HitEnvelope, SearchResponse, WriteReply},
    error::DocumentStoreResult,
    query::SearchRequest,
};

/// Abstract interface for index engines.
///
/// Write methods return [`WriteReply::Rejected`] for engine-level refusals (missing document,
/// version conflict, already exists) and reserve `Err` for transport and decoding failures, so
/// callers can tell "did not happen" from "could not be attempted".
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks.
#[async_trait]
pub trait IndexEngine: Send + Sync + Debug {
    /// Fetches a document by native key.
    ///
    /// Returns `Ok(None)` when the engine has no such document.
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>>;

    /// Checks whether a document exists without fetching its source.
    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool>;

    /// Creates a document, refusing to overwrite an existing one.
    ///
    /// When `id` is `None` the engine assigns a key.
    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply>;

    /// Applies an update request (`{"doc": {...}}`) to an existing document.
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply>;

    /// Stores `body` under `id`, replacing any existing document.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply>;

    /// Removes a document by native key.
    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply>;

    /// Runs a paginated search.
    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse>;

    /// Deletes a set of documents in one bulk request, reporting a result per item.
    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse>;

    /// Creates an empty index.
    async fn create_index(&self, index: &str) -> DocumentStoreResult<()>;

    /// Drops an index and every document in it.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the engine, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<E> IndexEngine for &E
where
    E: IndexEngine,
{
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>> {
        (*self).get_document(index, id).await
    }

    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        (*self).document_exists(index, id).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply> {
        (*self)
            .create_document(index, id, body)
            .await
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        (*self)
            .update_document(index, id, body)
            .await
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        (*self)
            .index_document(index, id, body)
            .await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply> {
        (*self).delete_document(index, id).await
    }

    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse> {
        (*self).search(index, request).await
    }

    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse> {
        (*self).bulk_delete(index, ids).await
    }

    async fn create_index(&self, index: &str) -> DocumentStoreResult<()> {
        (*self).create_index(index).await
    }

    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()> {
        (*self).drop_index(index).await
    }
}

#[async_trait]
impl<E> IndexEngine for Arc<E>
where
    E: IndexEngine + ?Sized,
{
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>> {
        (**self).get_document(index, id).await
    }

    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        (**self).document_exists(index, id).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply> {
        (**self)
            .create_document(index, id, body)
            .await
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        (**self)
            .update_document(index, id, body)
            .await
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        (**self)
            .index_document(index, id, body)
            .await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply> {
        (**self).delete_document(index, id).await
    }

    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse> {
        (**self).search(index, request).await
    }

    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse> {
        (**self).bulk_delete(index, ids).await
    }

    async fn create_index(&self, index: &str) -> DocumentStoreResult<()> {
        (**self).create_index(index).await
    }

    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()> {
        (**self).drop_index(index).await
    }
}

/// Object-safe counterpart of [`IndexEngine`], implemented for every engine.
///
/// `Box<dyn DynIndexEngine>` is itself an [`IndexEngine`], so repositories can be built over an
/// engine chosen at runtime.
#[async_trait]
pub trait DynIndexEngine: Send + Sync + Debug {
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>>;
    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool>;
    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply>;
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply>;
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply>;
    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply>;
    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse>;
    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse>;
    async fn create_index(&self, index: &str) -> DocumentStoreResult<()>;
    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<E: IndexEngine + 'static> DynIndexEngine for E {
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>> {
        IndexEngine::get_document(self, index, id).await
    }

    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        IndexEngine::document_exists(self, index, id).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply> {
        IndexEngine::create_document(self, index, id, body).await
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        IndexEngine::update_document(self, index, id, body).await
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        IndexEngine::index_document(self, index, id, body).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply> {
        IndexEngine::delete_document(self, index, id).await
    }

    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse> {
        IndexEngine::search(self, index, request).await
    }

    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse> {
        IndexEngine::bulk_delete(self, index, ids).await
    }

    async fn create_index(&self, index: &str) -> DocumentStoreResult<()> {
        IndexEngine::create_index(self, index).await
    }

    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()> {
        IndexEngine::drop_index(self, index).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        IndexEngine::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
impl IndexEngine for Box<dyn DynIndexEngine> {
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>> {
        DynIndexEngine::get_document(&**self, index, id).await
    }

    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        DynIndexEngine::document_exists(&**self, index, id).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply> {
        DynIndexEngine::create_document(&**self, index, id, body).await
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        DynIndexEngine::update_document(&**self, index, id, body).await
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        DynIndexEngine::index_document(&**self, index, id, body).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply> {
        DynIndexEngine::delete_document(&**self, index, id).await
    }

    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse> {
        DynIndexEngine::search(&**self, index, request).await
    }

    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse> {
        DynIndexEngine::bulk_delete(&**self, index, ids).await
    }

    async fn create_index(&self, index: &str) -> DocumentStoreResult<()> {
        DynIndexEngine::create_index(&**self, index).await
    }

    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()> {
        DynIndexEngine::drop_index(&**self, index).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        <dyn DynIndexEngine>::shutdown_boxed(self).await
    }
}

/// Factory for engine instances.
#[async_trait]
pub trait EngineBuilder {
    type Engine: IndexEngine;

    async fn build(self) -> DocumentStoreResult<Self::Engine>;
}
