//! In-memory index engine.
//!
//! This module provides an engine that keeps every index in process memory and answers with the
//! same envelopes, versions, shard counts and rejections as the real engine, so repositories can
//! be exercised without a cluster.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;
use uuid::Uuid;

use docmapper_core::{
    codec::Document,
    engine::{EngineBuilder, IndexEngine},
    envelope::{
        BulkItem, BulkResponse, HitEnvelope, Rejection, SearchHits, SearchResponse, ShardStats,
        TotalHits, WriteAck, WriteReply,
    },
    error::{DocumentStoreError, DocumentStoreResult},
    query::SearchRequest,
};

use crate::evaluator::{DocumentEvaluator, compare_by, parse_sort_clauses};

/// Hits returned when a search sets no `size`.
const DEFAULT_SEARCH_SIZE: u64 = 10;
const PRIMARY_TERM: i64 = 1;

#[derive(Debug, Clone)]
struct StoredDocument {
    source: Document,
    version: i64,
    seq_no: i64,
    /// Write order of the first creation; default search order.
    created: u64,
}

#[derive(Debug, Default)]
struct IndexState {
    documents: HashMap<String, StoredDocument>,
    next_seq_no: i64,
    next_created: u64,
}

impl IndexState {
    fn bump_seq_no(&mut self) -> i64 {
        let seq_no = self.next_seq_no;
        self.next_seq_no += 1;
        seq_no
    }

    fn bump_created(&mut self) -> u64 {
        let created = self.next_created;
        self.next_created += 1;
        created
    }
}

type StoreMap = HashMap<String, IndexState>;

/// Thread-safe in-memory index engine.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to be
/// safely shared across async tasks. Clones share the same underlying data.
///
/// # Semantics
///
/// - Writes bump the document version, starting at 1, and acknowledge one of one shard.
/// - Creating an existing document is rejected with `409`.
/// - Updating or deleting a missing document is rejected with `404`.
/// - An update that changes nothing is a `noop` acknowledged by zero shards.
/// - Searches scan every document of the index; see [`evaluator`](crate::evaluator) for the
///   supported queries.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::InMemoryStore;
/// use docmapper::engine::IndexEngine;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let body = json!({ "username": "tony" }).as_object().cloned().unwrap();
///     store.create_document("users", Some("u1"), body).await?;
///
///     assert!(store.document_exists("users", "u1").await?);
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// index name -> index state
    store: Arc<RwLock<StoreMap>>,
    auto_create_index: bool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory engine that creates indexes on first write.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            auto_create_index: true,
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of documents currently stored in `index`.
    pub async fn count(&self, index: &str) -> usize {
        self.store
            .read()
            .await
            .get(index)
            .map_or(0, |state| state.documents.len())
    }

    fn index_missing(index: &str) -> Rejection {
        Rejection::new(404, "index_not_found_exception", format!("no such index [{index}]"))
    }
}

fn acknowledged(index: &str, id: &str, document: &StoredDocument, result: &str) -> WriteReply {
    WriteReply::Acknowledged(WriteAck {
        index: index.to_string(),
        id: id.to_string(),
        version: Some(document.version),
        result: result.to_string(),
        shards: ShardStats { total: 1, successful: 1, failed: 0 },
    })
}

fn into_source(body: Value) -> Result<Document, Rejection> {
    match body {
        Value::Object(source) => Ok(source),
        other => Err(Rejection::new(
            400,
            "mapper_parsing_exception",
            format!("failed to parse, document is empty or not an object: {other}"),
        )),
    }
}

/// Merges `patch` into `target` the way partial updates do: objects merge key by key,
/// everything else is replaced.
fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[async_trait]
impl IndexEngine for InMemoryStore {
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>> {
        let store = self.store.read().await;

        Ok(store
            .get(index)
            .and_then(|state| state.documents.get(id))
            .map(|document| HitEnvelope {
                index: index.to_string(),
                id: id.to_string(),
                version: Some(document.version),
                seq_no: Some(document.seq_no),
                primary_term: Some(PRIMARY_TERM),
                score: None,
                found: Some(true),
                source: Some(document.source.clone()),
            }))
    }

    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        Ok(self
            .store
            .read()
            .await
            .get(index)
            .is_some_and(|state| state.documents.contains_key(id)))
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply> {
        let mut store = self.store.write().await;

        if !self.auto_create_index && !store.contains_key(index) {
            return Ok(WriteReply::Rejected(Self::index_missing(index)));
        }

        let state = store.entry(index.to_string()).or_default();
        let id = match id {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };

        if let Some(existing) = state.documents.get(&id) {
            return Ok(WriteReply::Rejected(Rejection::new(
                409,
                "version_conflict_engine_exception",
                format!(
                    "[{id}]: version conflict, document already exists (current version [{}])",
                    existing.version
                ),
            )));
        }

        let document = StoredDocument {
            source: body,
            version: 1,
            seq_no: state.bump_seq_no(),
            created: state.bump_created(),
        };
        let reply = acknowledged(index, &id, &document, "created");
        state.documents.insert(id, document);

        Ok(reply)
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        let patch = match body {
            Value::Object(mut body) => match body.remove("doc") {
                Some(Value::Object(patch)) => patch,
                _ => {
                    return Ok(WriteReply::Rejected(Rejection::new(
                        400,
                        "action_request_validation_exception",
                        "Validation Failed: 1: script or doc is missing;",
                    )));
                }
            },
            other => {
                return Ok(WriteReply::Rejected(Rejection::new(
                    400,
                    "x_content_parse_exception",
                    format!("update request must be an object, got {other}"),
                )));
            }
        };

        let mut store = self.store.write().await;

        let Some(state) = store.get_mut(index) else {
            return Ok(WriteReply::Rejected(Self::index_missing(index)));
        };

        let seq_no = state.next_seq_no;
        let Some(document) = state.documents.get_mut(id) else {
            return Ok(WriteReply::Rejected(Rejection::new(
                404,
                "document_missing_exception",
                format!("[{id}]: document missing"),
            )));
        };

        let mut merged = document.source.clone();
        merge(&mut merged, patch);

        if merged == document.source {
            return Ok(WriteReply::Acknowledged(WriteAck {
                index: index.to_string(),
                id: id.to_string(),
                version: Some(document.version),
                result: "noop".to_string(),
                shards: ShardStats::default(),
            }));
        }

        document.source = merged;
        document.version += 1;
        document.seq_no = seq_no;
        let reply = acknowledged(index, id, document, "updated");
        state.next_seq_no += 1;

        Ok(reply)
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        let source = match into_source(body) {
            Ok(source) => source,
            Err(rejection) => return Ok(WriteReply::Rejected(rejection)),
        };

        let mut store = self.store.write().await;

        if !self.auto_create_index && !store.contains_key(index) {
            return Ok(WriteReply::Rejected(Self::index_missing(index)));
        }

        let state = store.entry(index.to_string()).or_default();
        let seq_no = state.bump_seq_no();

        let (document, result) = match state.documents.remove(id) {
            Some(previous) => (
                StoredDocument {
                    source,
                    version: previous.version + 1,
                    seq_no,
                    created: previous.created,
                },
                "updated",
            ),
            None => (
                StoredDocument {
                    source,
                    version: 1,
                    seq_no,
                    created: state.bump_created(),
                },
                "created",
            ),
        };

        let reply = acknowledged(index, id, &document, result);
        state.documents.insert(id.to_string(), document);

        Ok(reply)
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply> {
        let mut store = self.store.write().await;

        let Some(state) = store.get_mut(index) else {
            return Ok(WriteReply::Rejected(Self::index_missing(index)));
        };

        match state.documents.remove(id) {
            Some(mut document) => {
                document.version += 1;
                document.seq_no = state.bump_seq_no();

                Ok(acknowledged(index, id, &document, "deleted"))
            }
            None => Ok(WriteReply::Rejected(Rejection::new(
                404,
                "not_found",
                format!("[{id}]: document not found"),
            ))),
        }
    }

    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse> {
        let store = self.store.read().await;

        let state = store.get(index).ok_or_else(|| {
            DocumentStoreError::Backend(format!("index_not_found_exception: no such index [{index}]"))
        })?;

        let query = request.query_or_match_all();
        let sort = parse_sort_clauses(&request.sort)?;

        let mut matched = Vec::new();
        for (id, document) in &state.documents {
            if DocumentEvaluator::new(id, &document.source).evaluate(&query)? {
                matched.push((id.as_str(), document));
            }
        }

        matched.sort_by_key(|(_, document)| document.created);
        matched.sort_by(|left, right| {
            sort.iter()
                .map(|key| compare_by(key, (left.0, &left.1.source), (right.0, &right.1.source)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = matched.len() as u64;
        let from = request.from.unwrap_or(0) as usize;
        let size = request.size.unwrap_or(DEFAULT_SEARCH_SIZE) as usize;
        let score = sort.is_empty().then_some(1.0);

        let hits = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(id, document)| HitEnvelope {
                index: index.to_string(),
                id: id.to_string(),
                version: request.version.then_some(document.version),
                seq_no: None,
                primary_term: None,
                score,
                found: None,
                source: Some(document.source.clone()),
            })
            .collect::<Vec<_>>();

        debug!(index, total, returned = hits.len(), "in-memory search");

        Ok(SearchResponse {
            took: 0,
            hits: SearchHits {
                total: TotalHits { value: total, ..Default::default() },
                hits,
            },
        })
    }

    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse> {
        let mut store = self.store.write().await;
        let mut state = store.get_mut(index);

        let items = ids
            .into_iter()
            .map(|id| {
                let removed = state
                    .as_deref_mut()
                    .and_then(|state| state.documents.remove(&id));

                match removed {
                    Some(_) => BulkItem {
                        id,
                        status: 200,
                        result: Some("deleted".to_string()),
                        error: None,
                    },
                    None => BulkItem {
                        id,
                        status: 404,
                        result: Some("not_found".to_string()),
                        error: None,
                    },
                }
            })
            .collect::<Vec<_>>();

        Ok(BulkResponse {
            took: 0,
            errors: items.iter().any(|item| item.error.is_some()),
            items,
        })
    }

    async fn create_index(&self, index: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.contains_key(index) {
            return Err(DocumentStoreError::Backend(format!(
                "resource_already_exists_exception: index [{index}] already exists"
            )));
        }

        store.insert(index.to_string(), IndexState::default());
        debug!(index, "in-memory index created");

        Ok(())
    }

    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(index).is_none() {
            return Err(DocumentStoreError::Backend(format!(
                "index_not_found_exception: no such index [{index}]"
            )));
        }

        debug!(index, "in-memory index dropped");

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::InMemoryStore;
/// use docmapper::engine::EngineBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder()
///         .auto_create_index(false)
///         .build()
///         .await
///         .unwrap();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStoreBuilder {
    auto_create_index: bool,
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self { auto_create_index: true }
    }
}

impl InMemoryStoreBuilder {
    /// Whether writes to a missing index create it (the default) or are rejected with `404`.
    pub fn auto_create_index(mut self, enabled: bool) -> Self {
        self.auto_create_index = enabled;
        self
    }
}

#[async_trait]
impl EngineBuilder for InMemoryStoreBuilder {
    type Engine = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Engine> {
        Ok(InMemoryStore {
            auto_create_index: self.auto_create_index,
            ..InMemoryStore::new()
        })
    }
}
