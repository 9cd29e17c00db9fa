//! Search request construction.
//!
//! Query fragments are built by the caller and stay opaque here. This module only deals with the
//! parts of a search request the repository owns: sorting, pagination and the total-hits flag.
//!
//! # Sort expressions
//!
//! A sort expression is a comma separated list of field names. A leading `-` sorts that field in
//! descending order, a leading `+` (or no prefix) in ascending order:
//!
//! ```ignore
//! use docmapper::query::{parse_sort, SortDirection};
//!
//! let sort = parse_sort("-dateOfBirth, username");
//! assert_eq!(sort[0].field, "dateOfBirth");
//! assert_eq!(sort[0].direction, SortDirection::Desc);
//! ```

use serde_json::{Map, Value, json};

use crate::field_map::FieldMap;

/// Sort direction for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One term of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }

    /// Engine sort clause for this term: `{"<field>": {"order": "asc"}}`.
    pub fn to_clause(&self) -> Value {
        json!({ self.field.as_str(): { "order": self.direction.as_str() } })
    }
}

/// Parses a sort expression into its terms, skipping blank ones.
pub fn parse_sort(expression: &str) -> Vec<Sort> {
    expression
        .split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (field, direction) = match term.as_bytes().first() {
                Some(b'-') => (&term[1..], SortDirection::Desc),
                Some(b'+') => (&term[1..], SortDirection::Asc),
                _ => (term, SortDirection::Asc),
            };
            let field = field.trim();

            (!field.is_empty()).then(|| Sort::new(field, direction))
        })
        .collect()
}

/// Translates a sort expression into engine sort clauses.
///
/// Each term is resolved to its wire key through the field map, by wire key or by in-memory
/// field name. Terms that match no field are dropped.
pub fn build_sort(expression: &str, map: &FieldMap) -> Vec<Value> {
    parse_sort(expression)
        .into_iter()
        .filter_map(|sort| {
            map.resolve_key(&sort.field)
                .map(|key| Sort::new(key, sort.direction).to_clause())
        })
        .collect()
}

/// A paginated search request.
///
/// Serializes into the body of a search call:
/// `{"query": ..., "sort": [...], "from": n, "size": n, "track_total_hits": true}`, plus
/// `"version": true` when hits must carry their document version.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Engine query fragment. `None` matches every document.
    pub query: Option<Value>,
    pub sort: Vec<Value>,
    pub from: Option<u64>,
    pub size: Option<u64>,
    pub track_total_hits: bool,
    pub version: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            sort: Vec::new(),
            from: None,
            size: None,
            track_total_hits: true,
            version: false,
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new search request builder.
    pub fn builder() -> SearchRequestBuilder {
        SearchRequestBuilder::new()
    }

    /// The query fragment, or `match_all` when none was set.
    pub fn query_or_match_all(&self) -> Value {
        self.query
            .clone()
            .unwrap_or_else(|| json!({ "match_all": {} }))
    }

    /// Builds the JSON body sent to the engine.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();

        body.insert("query".to_string(), self.query_or_match_all());

        if !self.sort.is_empty() {
            body.insert("sort".to_string(), Value::Array(self.sort.clone()));
        }
        if let Some(from) = self.from {
            body.insert("from".to_string(), Value::from(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), Value::from(size));
        }

        body.insert("track_total_hits".to_string(), Value::Bool(self.track_total_hits));

        if self.version {
            body.insert("version".to_string(), Value::Bool(true));
        }

        Value::Object(body)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequestBuilder {
    request: SearchRequest,
}

impl SearchRequestBuilder {
    pub fn new() -> Self {
        Self { request: SearchRequest::default() }
    }

    pub fn query(mut self, query: Value) -> Self {
        self.request.query = Some(query);
        self
    }

    pub fn sort(mut self, sort: Vec<Value>) -> Self {
        self.request.sort = sort;
        self
    }

    /// Sets the number of hits to skip.
    pub fn from(mut self, from: u64) -> Self {
        self.request.from = Some(from);
        self
    }

    /// Sets the maximum number of hits to return.
    pub fn size(mut self, size: u64) -> Self {
        self.request.size = Some(size);
        self
    }

    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.request.track_total_hits = track;
        self
    }

    /// Asks the engine to return each hit's document version.
    pub fn version(mut self, version: bool) -> Self {
        self.request.version = version;
        self
    }

    pub fn build(self) -> SearchRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field_map::FieldMapOptions,
        record::{FieldDescriptor, FieldKind},
    };
    use pretty_assertions::assert_eq;

    const USER: &[FieldDescriptor] = &[
        FieldDescriptor::new("id", FieldKind::String).identifier(),
        FieldDescriptor::new("username", FieldKind::String),
        FieldDescriptor::new("date_of_birth", FieldKind::Optional).key("dateOfBirth"),
    ];

    #[test]
    fn parses_directions_and_skips_blank_terms() {
        assert_eq!(
            parse_sort(" -dateOfBirth, +username ,, id,-"),
            vec![
                Sort::new("dateOfBirth", SortDirection::Desc),
                Sort::new("username", SortDirection::Asc),
                Sort::new("id", SortDirection::Asc),
            ],
        );
    }

    #[test]
    fn empty_expression_has_no_terms() {
        assert!(parse_sort("").is_empty());
    }

    #[test]
    fn sort_terms_resolve_through_the_field_map() {
        let map = FieldMap::from_descriptors("User", USER, &FieldMapOptions::default()).unwrap();

        assert_eq!(
            build_sort("-date_of_birth,username,nickname", &map),
            vec![
                json!({ "dateOfBirth": { "order": "desc" } }),
                json!({ "username": { "order": "asc" } }),
            ],
        );
    }

    #[test]
    fn body_carries_pagination_and_exact_totals() {
        let request = SearchRequest::builder()
            .query(json!({ "term": { "username": "tony" } }))
            .sort(vec![json!({ "username": { "order": "asc" } })])
            .from(20)
            .size(10)
            .build();

        assert_eq!(
            request.to_body(),
            json!({
                "query": { "term": { "username": "tony" } },
                "sort": [{ "username": { "order": "asc" } }],
                "from": 20,
                "size": 10,
                "track_total_hits": true
            }),
        );
    }

    #[test]
    fn missing_query_matches_everything() {
        assert_eq!(
            SearchRequest::new().to_body(),
            json!({ "query": { "match_all": {} }, "track_total_hits": true }),
        );
    }
}
