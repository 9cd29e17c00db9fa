//! Filtered, paginated search over a repository.
//!
//! A [`SearchRepository`] pairs a [`Repository`] with two caller supplied functions: one turning a
//! filter into an engine query fragment, the other into a sort expression. Every CRUD operation of
//! the wrapped repository is forwarded unchanged.

use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::{
    batch::BatchDelete,
    codec::{self, Document},
    engine::IndexEngine,
    error::DocumentStoreResult,
    outcome::Outcome,
    page::{Page, PaginationParams},
    query::{SearchRequest, build_sort},
    record::Record,
    repository::Repository,
};

type QueryBuilderFn<F> = Box<dyn Fn(&F) -> Value + Send + Sync>;
type SortResolverFn<F> = Box<dyn Fn(&F) -> String + Send + Sync>;
type MapperFn<R> = Box<dyn Fn(&mut R) + Send + Sync>;

/// Search access for one record shape and one filter type.
///
/// # Type Parameters
///
/// * `E` - The engine handle
/// * `R` - The record shape
/// * `F` - The filter type understood by the query builder and the sort resolver
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
///
/// let users = Repository::<_, User>::new(engine, "users")?.into_search(
///     |filter: &UserFilter| json!({ "term": { "status": filter.status } }),
///     |filter: &UserFilter| filter.sort.clone(),
/// );
///
/// let page = users.search(&filter, 10, 0).await?;
/// ```
pub struct SearchRepository<E: IndexEngine, R: Record, F> {
    /// The wrapped repository serving the CRUD operations.
    pub repository: Repository<E, R>,
    build_query: QueryBuilderFn<F>,
    get_sort: SortResolverFn<F>,
    mapper: Option<MapperFn<R>>,
}

impl<E: IndexEngine, R: Record, F> SearchRepository<E, R, F> {
    pub fn new(
        repository: Repository<E, R>,
        build_query: impl Fn(&F) -> Value + Send + Sync + 'static,
        get_sort: impl Fn(&F) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            repository,
            build_query: Box::new(build_query),
            get_sort: Box::new(get_sort),
            mapper: None,
        }
    }

    /// Sets a function applied to every record decoded from a search.
    pub fn with_mapper(mut self, mapper: impl Fn(&mut R) + Send + Sync + 'static) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }

    /// Builds the search request a filter translates to.
    pub fn request_for(&self, filter: &F, limit: u64, offset: u64) -> SearchRequest {
        let sort = build_sort(&(self.get_sort)(filter), self.repository.field_map());

        SearchRequest::builder()
            .query((self.build_query)(filter))
            .sort(sort)
            .from(offset)
            .size(limit)
            .track_total_hits(true)
            .version(self.repository.field_map().version().is_some())
            .build()
    }

    /// Returns at most `limit` records matching the filter, skipping the first `offset`.
    ///
    /// The page's `total` is the number of matches in the whole index, not the number of items
    /// returned.
    pub async fn search(&self, filter: &F, limit: u64, offset: u64) -> DocumentStoreResult<Page<R>> {
        let (items, total) = self.fetch(filter, limit, offset).await?;

        Ok(Page::builder(items).with_total(total).build())
    }

    /// Like [`search`](Self::search), addressing the page by number.
    pub async fn search_page(&self, filter: &F, params: &PaginationParams) -> DocumentStoreResult<Page<R>> {
        let (items, total) = self
            .fetch(filter, params.limit(), params.offset())
            .await?;

        Ok(params.to_page(items, total))
    }

    async fn fetch(&self, filter: &F, limit: u64, offset: u64) -> DocumentStoreResult<(Vec<R>, u64)> {
        let index = self.repository.index();
        let request = self.request_for(filter, limit, offset);

        let response = self
            .repository
            .engine()
            .search(index, request)
            .await?;
        let total = response.hits.total.value;

        debug!(index, total, returned = response.hits.hits.len(), limit, offset, "search finished");

        let items = response
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let mut record: R = codec::decode_hit(hit, self.repository.field_map())?;
                if let Some(mapper) = &self.mapper {
                    mapper(&mut record);
                }
                Ok(record)
            })
            .collect::<DocumentStoreResult<Vec<R>>>()?;

        Ok((items, total))
    }

    pub async fn load(&self, id: &str) -> DocumentStoreResult<Option<R>> {
        self.repository.load(id).await
    }

    pub async fn exists(&self, id: &str) -> DocumentStoreResult<bool> {
        self.repository.exists(id).await
    }

    pub async fn create(&self, record: &R) -> DocumentStoreResult<Outcome> {
        self.repository.create(record).await
    }

    pub async fn update(&self, record: &R) -> DocumentStoreResult<Outcome> {
        self.repository.update(record).await
    }

    pub async fn patch(&self, patch: &mut Document) -> DocumentStoreResult<Outcome> {
        self.repository.patch(patch).await
    }

    pub async fn save(&self, record: &R) -> DocumentStoreResult<Outcome> {
        self.repository.save(record).await
    }

    pub async fn delete(&self, id: &str) -> DocumentStoreResult<Outcome> {
        self.repository.delete(id).await
    }

    pub async fn delete_batch<I, S>(&self, ids: I) -> BatchDelete
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repository.delete_batch(ids).await
    }

    pub async fn all(&self) -> DocumentStoreResult<Vec<R>> {
        self.repository.all().await
    }
}

impl<E: IndexEngine, R: Record, F> fmt::Debug for SearchRepository<E, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRepository")
            .field("repository", &self.repository)
            .field("mapper", &self.mapper.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        envelope::{BulkResponse, HitEnvelope, SearchHits, SearchResponse, TotalHits, WriteReply},
        error::DocumentStoreError,
        record::{FieldDescriptor, FieldKind},
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        name: String,
    }

    impl Record for Item {
        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[
                FieldDescriptor::new("id", FieldKind::String).identifier(),
                FieldDescriptor::new("name", FieldKind::String),
            ];
            FIELDS
        }
    }

    struct Filter {
        name: &'static str,
        sort: &'static str,
    }

    /// Engine answering every search with a fixed response and remembering the last request.
    #[derive(Debug, Default)]
    struct CannedSearch {
        response: SearchResponse,
        last: Mutex<Option<SearchRequest>>,
    }

    #[async_trait]
    impl IndexEngine for CannedSearch {
        async fn get_document(&self, _: &str, _: &str) -> DocumentStoreResult<Option<HitEnvelope>> {
            unimplemented!()
        }

        async fn document_exists(&self, _: &str, _: &str) -> DocumentStoreResult<bool> {
            unimplemented!()
        }

        async fn create_document(
            &self,
            _: &str,
            _: Option<&str>,
            _: Document,
        ) -> DocumentStoreResult<WriteReply> {
            unimplemented!()
        }

        async fn update_document(&self, _: &str, _: &str, _: Value) -> DocumentStoreResult<WriteReply> {
            unimplemented!()
        }

        async fn index_document(&self, _: &str, _: &str, _: Value) -> DocumentStoreResult<WriteReply> {
            unimplemented!()
        }

        async fn delete_document(&self, _: &str, _: &str) -> DocumentStoreResult<WriteReply> {
            unimplemented!()
        }

        async fn search(&self, _: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse> {
            *self.last.lock().unwrap() = Some(request);
            Ok(self.response.clone())
        }

        async fn bulk_delete(&self, _: &str, _: Vec<String>) -> DocumentStoreResult<BulkResponse> {
            unimplemented!()
        }

        async fn create_index(&self, _: &str) -> DocumentStoreResult<()> {
            unimplemented!()
        }

        async fn drop_index(&self, _: &str) -> DocumentStoreResult<()> {
            unimplemented!()
        }
    }

    fn hit(id: &str, name: &str) -> HitEnvelope {
        HitEnvelope {
            index: "items".to_string(),
            id: id.to_string(),
            version: Some(1),
            seq_no: None,
            primary_term: None,
            score: Some(1.0),
            found: None,
            source: json!({ "name": name }).as_object().cloned(),
        }
    }

    fn searcher(engine: &CannedSearch) -> SearchRepository<&CannedSearch, Item, Filter> {
        Repository::new(engine, "items")
            .unwrap()
            .into_search(
                |filter: &Filter| json!({ "match": { "name": filter.name } }),
                |filter: &Filter| filter.sort.to_string(),
            )
    }

    #[tokio::test]
    async fn request_carries_query_sort_and_window() {
        let engine = CannedSearch::default();
        let filter = Filter { name: "lamp", sort: "-name,unknown" };

        searcher(&engine).search(&filter, 10, 20).await.unwrap();

        let request = engine.last.lock().unwrap().clone().unwrap();
        assert_eq!(
            request.to_body(),
            json!({
                "query": { "match": { "name": "lamp" } },
                "sort": [{ "name": { "order": "desc" } }],
                "from": 20,
                "size": 10,
                "track_total_hits": true
            }),
        );
    }

    #[tokio::test]
    async fn hits_decode_in_engine_order_with_their_ids() {
        let engine = CannedSearch {
            response: SearchResponse {
                took: 1,
                hits: SearchHits {
                    total: TotalHits { value: 42, ..Default::default() },
                    hits: vec![hit("b", "bulb"), hit("a", "lamp")],
                },
            },
            ..Default::default()
        };

        let page = searcher(&engine)
            .search(&Filter { name: "", sort: "" }, 2, 0)
            .await
            .unwrap();

        assert_eq!(page.total, 42);
        assert_eq!(
            page.items,
            vec![
                Item { id: "b".to_string(), name: "bulb".to_string() },
                Item { id: "a".to_string(), name: "lamp".to_string() },
            ],
        );
    }

    #[tokio::test]
    async fn mapper_runs_on_every_hit() {
        let engine = CannedSearch {
            response: SearchResponse {
                took: 1,
                hits: SearchHits {
                    total: TotalHits { value: 1, ..Default::default() },
                    hits: vec![hit("a", "lamp")],
                },
            },
            ..Default::default()
        };

        let page = searcher(&engine)
            .with_mapper(|item: &mut Item| item.name = item.name.to_uppercase())
            .search(&Filter { name: "", sort: "" }, 10, 0)
            .await
            .unwrap();

        assert_eq!(page.items[0].name, "LAMP");
    }

    #[tokio::test]
    async fn undecodable_hit_fails_the_search() {
        let mut broken = hit("a", "lamp");
        broken.source = json!({ "name": 5 }).as_object().cloned();
        let engine = CannedSearch {
            response: SearchResponse {
                took: 1,
                hits: SearchHits {
                    total: TotalHits { value: 1, ..Default::default() },
                    hits: vec![broken],
                },
            },
            ..Default::default()
        };

        let result = searcher(&engine)
            .search(&Filter { name: "", sort: "" }, 10, 0)
            .await;

        assert!(matches!(result, Err(DocumentStoreError::Serialization(_))));
    }
}
