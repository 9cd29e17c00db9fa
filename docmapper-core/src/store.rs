//! Main entry point for working with an index engine.
//!
//! This module provides the store types handing out repositories:
//!
//! - [`DocumentStore`] - Typed store bound to a specific engine implementation
//! - [`DynDocumentStore`] - Store over a boxed engine chosen at runtime
//!
//! # Example
//!
//! ```ignore
//! use docmapper::store::DocumentStore;
//!
//! let store = DocumentStore::new(engine);
//! store.create_index("users").await?;
//!
//! let users = store.repository::<User>("users")?;
//! ```

use serde_json::Value;
use std::any::Any;

use crate::{
    engine::{DynIndexEngine, IndexEngine},
    error::DocumentStoreResult,
    field_map::FieldMapOptions,
    record::Record,
    repository::Repository,
    search::SearchRepository,
};

/// A document store bound to a specific engine implementation.
///
/// Repositories obtained from the store borrow its engine; build a [`Repository`] directly
/// over an `Arc` of the engine when it must outlive the store.
///
/// # Type Parameters
///
/// * `E` - The engine implementation type
#[derive(Debug)]
pub struct DocumentStore<E: IndexEngine> {
    engine: E,
}

/// A document store over a type-erased engine.
pub type DynDocumentStore = DocumentStore<Box<dyn DynIndexEngine>>;

impl<E: IndexEngine> DocumentStore<E> {
    /// Creates a new document store with the given engine.
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Gets a repository for record shape `R` stored in `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape's field map is invalid.
    pub fn repository<R: Record>(&self, index: &str) -> DocumentStoreResult<Repository<&E, R>> {
        Repository::new(&self.engine, index)
    }

    /// Gets a repository, overriding the identifier and version fields by name.
    pub fn repository_with_options<R: Record>(
        &self,
        index: &str,
        options: FieldMapOptions,
    ) -> DocumentStoreResult<Repository<&E, R>> {
        Repository::with_options(&self.engine, index, options)
    }

    /// Gets a search repository for record shape `R` filtered by `F`.
    pub fn search_repository<R: Record, F>(
        &self,
        index: &str,
        build_query: impl Fn(&F) -> Value + Send + Sync + 'static,
        get_sort: impl Fn(&F) -> String + Send + Sync + 'static,
    ) -> DocumentStoreResult<SearchRepository<&E, R, F>> {
        Ok(self
            .repository(index)?
            .into_search(build_query, get_sort))
    }

    /// Creates an empty index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index already exists or creation fails.
    pub async fn create_index(&self, index: &str) -> DocumentStoreResult<()> {
        self.engine.create_index(index).await
    }

    /// Drops an index with every document in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not exist or deletion fails.
    pub async fn drop_index(&self, index: &str) -> DocumentStoreResult<()> {
        self.engine.drop_index(index).await
    }

    /// Shuts down the store and releases engine resources.
    ///
    /// This consumes the store and should be called when no longer needed.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.engine.shutdown().await
    }
}

impl<E: IndexEngine + 'static> DocumentStore<E> {
    /// Erases the engine type.
    pub fn into_dyn(self) -> DynDocumentStore {
        let engine: Box<dyn DynIndexEngine> = Box::new(self.engine);

        DocumentStore::new(engine)
    }
}

impl DynDocumentStore {
    /// Returns the engine as its concrete type, if it is a `T`.
    pub fn engine_as<T: Any>(&self) -> Option<&T> {
        (*self.engine).as_any().downcast_ref::<T>()
    }
}
