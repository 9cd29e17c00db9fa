//! Typed document repositories.
//!
//! A [`Repository`] binds one record shape to one index of an engine. It owns the shape's
//! [`FieldMap`], built and validated once at construction, and translates every CRUD call into
//! exactly one engine request.
//!
//! # Outcomes
//!
//! Writes report what happened through an [`Outcome`]:
//!
//! | Operation | Acknowledged | Rejected |
//! |---|---|---|
//! | [`create`](Repository::create) | document version | `Outcome::NONE` |
//! | [`update`](Repository::update), [`patch`](Repository::patch), [`save`](Repository::save) | successful shard count | `Outcome::CONFLICT` on a version conflict, [`DocumentNotExists`](DocumentStoreError::DocumentNotExists) otherwise |
//! | [`delete`](Repository::delete) | successful shard count | [`DocumentNotExists`](DocumentStoreError::DocumentNotExists) |
//!
//! # Example
//!
//! ```ignore
//! use docmapper::{prelude::*, memory::InMemoryStore};
//!
//! let users = Repository::<_, User>::new(InMemoryStore::new(), "users")?;
//!
//! users.create(&user).await?;
//! let loaded = users.load("u1").await?;
//! ```

use serde_json::{Value, json};
use std::{fmt, marker::PhantomData, sync::Arc};
use tracing::{debug, warn};

use crate::{
    batch::{BatchDelete, BulkConfig, BulkDeleter},
    codec::{self, Document},
    engine::IndexEngine,
    envelope::WriteReply,
    error::{DocumentStoreError, DocumentStoreResult},
    field_map::{FieldMap, FieldMapOptions},
    outcome::Outcome,
    query::SearchRequest,
    record::Record,
    search::SearchRepository,
};

/// Largest page the engine serves by default; [`Repository::all`] reads at most this many hits.
pub const MAX_RESULT_WINDOW: u64 = 10_000;

/// CRUD access to the documents of one record shape stored in one index.
///
/// # Type Parameters
///
/// * `E` - The engine handle (an owned engine, a reference, an `Arc` or a boxed trait object)
/// * `R` - The record shape
pub struct Repository<E: IndexEngine, R: Record> {
    engine: E,
    index: String,
    field_map: Arc<FieldMap>,
    bulk: BulkConfig,
    _record: PhantomData<fn() -> R>,
}

impl<E: IndexEngine, R: Record> Repository<E, R> {
    /// Creates a repository with the shape's declared identifier and version fields.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidShape`] when the shape has no usable identifier.
    pub fn new(engine: E, index: impl Into<String>) -> DocumentStoreResult<Self> {
        Self::with_options(engine, index, FieldMapOptions::default())
    }

    /// Creates a repository, overriding the identifier and version fields by name.
    pub fn with_options(
        engine: E,
        index: impl Into<String>,
        options: FieldMapOptions,
    ) -> DocumentStoreResult<Self> {
        let field_map = FieldMap::build::<R>(&options)?;

        Ok(Self::with_field_map(engine, index, Arc::new(field_map)))
    }

    /// Creates a repository sharing an already validated field map.
    pub fn with_field_map(engine: E, index: impl Into<String>, field_map: Arc<FieldMap>) -> Self {
        Self {
            engine,
            index: index.into(),
            field_map,
            bulk: BulkConfig::default(),
            _record: PhantomData,
        }
    }

    /// Replaces the bulk settings used by [`delete_batch`](Self::delete_batch).
    pub fn with_bulk_config(mut self, bulk: BulkConfig) -> Self {
        self.bulk = bulk;
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn field_map(&self) -> &Arc<FieldMap> {
        &self.field_map
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Turns this repository into a search repository.
    ///
    /// `build_query` turns a filter into an engine query fragment, `get_sort` into a sort
    /// expression such as `"-dateOfBirth,username"`.
    pub fn into_search<F>(
        self,
        build_query: impl Fn(&F) -> Value + Send + Sync + 'static,
        get_sort: impl Fn(&F) -> String + Send + Sync + 'static,
    ) -> SearchRepository<E, R, F> {
        SearchRepository::new(self, build_query, get_sort)
    }

    /// Loads a record by identifier.
    ///
    /// Returns `Ok(None)` when no such document exists.
    pub async fn load(&self, id: &str) -> DocumentStoreResult<Option<R>> {
        let Some(hit) = self.engine.get_document(&self.index, id).await? else {
            return Ok(None);
        };

        if hit.found == Some(false) {
            return Ok(None);
        }

        codec::decode_hit(hit, &self.field_map).map(Some)
    }

    /// Checks whether a document exists without decoding it.
    pub async fn exists(&self, id: &str) -> DocumentStoreResult<bool> {
        self.engine
            .document_exists(&self.index, id)
            .await
    }

    /// Creates a new document.
    ///
    /// An empty identifier lets the engine assign one. Returns the document version, or
    /// [`Outcome::NONE`] when the engine refuses the create (typically because the identifier
    /// is already taken).
    pub async fn create(&self, record: &R) -> DocumentStoreResult<Outcome> {
        let id = codec::identifier_of(record, &self.field_map)?;
        let document = codec::encode(record, &self.field_map)?;
        let native_id = (!id.is_empty()).then_some(id.as_str());

        match self
            .engine
            .create_document(&self.index, native_id, document)
            .await?
        {
            WriteReply::Acknowledged(ack) => {
                debug!(index = %self.index, id = %ack.id, version = ?ack.version, "document created");

                Ok(Outcome(ack.version.unwrap_or(ack.shards.successful)))
            }
            WriteReply::Rejected(rejection) => {
                debug!(
                    index = %self.index,
                    id = %id,
                    status = rejection.status,
                    reason = %rejection.reason,
                    "document create rejected"
                );

                Ok(Outcome::NONE)
            }
        }
    }

    /// Merges the record's fields into an existing document.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentStoreError::MissingIdentifier`] without contacting the engine when
    /// the record has an empty identifier, and with [`DocumentStoreError::DocumentNotExists`]
    /// when the document is missing.
    pub async fn update(&self, record: &R) -> DocumentStoreResult<Outcome> {
        let id = codec::identifier_of(record, &self.field_map)?;

        if id.is_empty() {
            return Err(DocumentStoreError::MissingIdentifier(
                self.field_map.id_key().to_string(),
            ));
        }

        let document = codec::encode(record, &self.field_map)?;
        let reply = self
            .engine
            .update_document(&self.index, &id, json!({ "doc": document }))
            .await?;

        self.write_outcome("update", &id, reply)
    }

    /// Applies a partial document keyed by wire keys.
    ///
    /// The identifier is read from the map under the identifier key and removed for the
    /// duration of the request. It is put back before returning, whatever the result.
    pub async fn patch(&self, patch: &mut Document) -> DocumentStoreResult<Outcome> {
        let key = self.field_map.id_key();
        let id = codec::take_identifier(patch, key)?;

        let body = json!({ "doc": patch });
        let reply = self
            .engine
            .update_document(&self.index, &id, body)
            .await;

        let outcome = reply.and_then(|reply| self.write_outcome("patch", &id, reply));
        codec::restore_identifier(patch, key, id);

        outcome
    }

    /// Replaces a document, or creates one when the record has no identifier.
    pub async fn save(&self, record: &R) -> DocumentStoreResult<Outcome> {
        let id = codec::identifier_of(record, &self.field_map)?;

        if id.is_empty() {
            return self.create(record).await;
        }

        let document = codec::encode(record, &self.field_map)?;
        let reply = self
            .engine
            .index_document(&self.index, &id, json!({ "doc": document }))
            .await?;

        self.write_outcome("save", &id, reply)
    }

    /// Deletes a document by identifier.
    pub async fn delete(&self, id: &str) -> DocumentStoreResult<Outcome> {
        match self
            .engine
            .delete_document(&self.index, id)
            .await?
        {
            WriteReply::Acknowledged(ack) => {
                debug!(index = %self.index, id, "document deleted");

                Ok(Outcome(ack.shards.successful))
            }
            WriteReply::Rejected(rejection) => {
                debug!(index = %self.index, id, status = rejection.status, "document delete rejected");

                Err(DocumentStoreError::DocumentNotExists)
            }
        }
    }

    /// Deletes many documents through bulk requests.
    ///
    /// Ids the engine fails land in [`BatchDelete::failed_ids`]. The first error affecting the
    /// batch as a whole is kept in [`BatchDelete::error`]; the remaining ids are still submitted
    /// and the deleter is always closed.
    pub async fn delete_batch<I, S>(&self, ids: I) -> BatchDelete
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut failed_ids = Vec::new();
        let mut error = None;

        let mut deleter = BulkDeleter::new(&self.engine, self.index.as_str(), self.bulk)
            .on_failure(|item| failed_ids.push(item.id.clone()));

        for id in ids {
            if let Err(e) = deleter.add(id).await {
                error.get_or_insert(e);
            }
        }

        match deleter.close().await {
            Ok(stats) => {
                debug!(
                    index = %self.index,
                    succeeded = stats.succeeded,
                    failed = stats.failed,
                    "batch delete finished"
                );
            }
            Err(e) => {
                error.get_or_insert(e);
            }
        }

        BatchDelete { failed_ids, error }
    }

    /// Lists every document of the index, up to [`MAX_RESULT_WINDOW`].
    pub async fn all(&self) -> DocumentStoreResult<Vec<R>> {
        let request = SearchRequest::builder()
            .size(MAX_RESULT_WINDOW)
            .version(self.field_map.version().is_some())
            .build();

        let response = self.engine.search(&self.index, request).await?;

        response
            .hits
            .hits
            .into_iter()
            .map(|hit| codec::decode_hit(hit, &self.field_map))
            .collect()
    }

    fn write_outcome(&self, operation: &str, id: &str, reply: WriteReply) -> DocumentStoreResult<Outcome> {
        match reply {
            WriteReply::Acknowledged(ack) => {
                debug!(index = %self.index, id, operation, result = %ack.result, "document written");

                Ok(Outcome(ack.shards.successful))
            }
            WriteReply::Rejected(rejection) if rejection.is_conflict() => {
                warn!(index = %self.index, id, operation, reason = %rejection.reason, "version conflict");

                Ok(Outcome::CONFLICT)
            }
            WriteReply::Rejected(rejection) => {
                debug!(
                    index = %self.index,
                    id,
                    operation,
                    status = rejection.status,
                    reason = %rejection.reason,
                    "document write rejected"
                );

                Err(DocumentStoreError::DocumentNotExists)
            }
        }
    }
}

impl<E: IndexEngine + Clone, R: Record> Clone for Repository<E, R> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            index: self.index.clone(),
            field_map: Arc::clone(&self.field_map),
            bulk: self.bulk,
            _record: PhantomData,
        }
    }
}

impl<E: IndexEngine, R: Record> fmt::Debug for Repository<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("record", &R::type_name())
            .field("index", &self.index)
            .field("engine", &self.engine)
            .finish()
    }
}
