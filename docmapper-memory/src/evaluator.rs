//! Query DSL evaluation for in-memory searches.
//!
//! This module evaluates the subset of the engine's query DSL that repositories and their query
//! builders commonly produce, and orders documents the way the engine's `sort` clause does.
//!
//! Supported queries: `match_all`, `match_none`, `ids`, `term`, `terms`, `match`, `prefix`,
//! `range`, `exists` and `bool` (`must`, `filter`, `should`, `must_not`,
//! `minimum_should_match`). Field names may be dotted paths into nested objects.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use docmapper_core::{
    codec::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    query::SortDirection,
};

/// Type-erased, comparable representation of JSON values.
///
/// Numbers are normalized to `f64`. Strings compare lexically, which orders ISO-8601 dates
/// chronologically.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(&'a Map<String, Value>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value
                .as_f64()
                .map(Comparable::Number)
                .unwrap_or(Comparable::Null),
            Value::String(value) => Comparable::String(value),
            Value::Array(values) => Comparable::Array(
                values
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Value::Object(map) => Comparable::Map(map),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted field path inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    if let Some(value) = document.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

pub(crate) struct DocumentEvaluator<'a> {
    id: &'a str,
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(id: &'a str, document: &'a Document) -> Self {
        Self { id, document }
    }

    /// Evaluates a query clause against the document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Backend`] for malformed or unsupported clauses.
    pub fn evaluate(&self, query: &Value) -> DocumentStoreResult<bool> {
        let (kind, body) = single_entry(query)?;

        match kind {
            "match_all" => Ok(true),
            "match_none" => Ok(false),
            "ids" => self.visit_ids(body),
            "term" => self.visit_term(body),
            "terms" => self.visit_terms(body),
            "match" => self.visit_match(body),
            "prefix" => self.visit_prefix(body),
            "range" => self.visit_range(body),
            "exists" => self.visit_exists(body),
            "bool" => self.visit_bool(body),
            other => Err(unsupported(format!("unknown query [{other}]"))),
        }
    }

    fn visit_ids(&self, body: &Value) -> DocumentStoreResult<bool> {
        let values = body
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| unsupported("[ids] requires an array of values"))?;

        Ok(values.iter().any(|value| value.as_str() == Some(self.id)))
    }

    fn visit_term(&self, body: &Value) -> DocumentStoreResult<bool> {
        let (field, spec) = single_entry(body)?;
        let expected = match spec {
            Value::Object(options) => options
                .get("value")
                .ok_or_else(|| unsupported("[term] requires a value"))?,
            value => value,
        };

        Ok(self.any_value(field, |value| Comparable::from(value) == Comparable::from(expected)))
    }

    fn visit_terms(&self, body: &Value) -> DocumentStoreResult<bool> {
        let (field, spec) = single_entry(body)?;
        let expected = spec
            .as_array()
            .ok_or_else(|| unsupported("[terms] requires an array of values"))?;

        Ok(self.any_value(field, |value| {
            expected
                .iter()
                .any(|candidate| Comparable::from(value) == Comparable::from(candidate))
        }))
    }

    fn visit_match(&self, body: &Value) -> DocumentStoreResult<bool> {
        let (field, spec) = single_entry(body)?;
        let (query, operator) = match spec {
            Value::Object(options) => (
                options
                    .get("query")
                    .ok_or_else(|| unsupported("[match] requires a query"))?,
                options
                    .get("operator")
                    .and_then(Value::as_str)
                    .unwrap_or("or"),
            ),
            value => (value, "or"),
        };

        let wanted = match query {
            Value::String(text) => tokenize(text),
            other => return Ok(self.any_value(field, |value| Comparable::from(value) == Comparable::from(other))),
        };

        if wanted.is_empty() {
            return Ok(false);
        }

        let mut present = Vec::new();
        self.for_each_value(field, |value| {
            if let Value::String(text) = value {
                present.extend(tokenize(text));
            }
        });

        Ok(if operator.eq_ignore_ascii_case("and") {
            wanted.iter().all(|token| present.contains(token))
        } else {
            wanted.iter().any(|token| present.contains(token))
        })
    }

    fn visit_prefix(&self, body: &Value) -> DocumentStoreResult<bool> {
        let (field, spec) = single_entry(body)?;
        let prefix = match spec {
            Value::Object(options) => options.get("value").and_then(Value::as_str),
            value => value.as_str(),
        }
        .ok_or_else(|| unsupported("[prefix] requires a string value"))?;

        Ok(self.any_value(field, |value| {
            value
                .as_str()
                .is_some_and(|text| text.starts_with(prefix))
        }))
    }

    fn visit_range(&self, body: &Value) -> DocumentStoreResult<bool> {
        let (field, spec) = single_entry(body)?;
        let bounds = spec
            .as_object()
            .ok_or_else(|| unsupported("[range] requires an object of bounds"))?;

        Ok(self.any_value(field, |value| {
            let value = Comparable::from(value);

            bounds.iter().all(|(op, bound)| {
                let ordering = value.partial_cmp(&Comparable::from(bound));

                match op.as_str() {
                    "gt" => ordering == Some(Ordering::Greater),
                    "gte" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                    "lt" => ordering == Some(Ordering::Less),
                    "lte" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    _ => true,
                }
            })
        }))
    }

    fn visit_exists(&self, body: &Value) -> DocumentStoreResult<bool> {
        let field = body
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| unsupported("[exists] requires a field"))?;

        Ok(match lookup(self.document, field) {
            None | Some(Value::Null) => false,
            Some(Value::Array(values)) => values.iter().any(|value| !value.is_null()),
            Some(_) => true,
        })
    }

    fn visit_bool(&self, body: &Value) -> DocumentStoreResult<bool> {
        for clause in clauses(body, "must").into_iter().chain(clauses(body, "filter")) {
            if !self.evaluate(clause)? {
                return Ok(false);
            }
        }

        for clause in clauses(body, "must_not") {
            if self.evaluate(clause)? {
                return Ok(false);
            }
        }

        let should = clauses(body, "should");
        if should.is_empty() {
            return Ok(true);
        }

        let required = match body.get("minimum_should_match").and_then(Value::as_u64) {
            Some(minimum) => minimum as usize,
            None if body.get("must").is_some() || body.get("filter").is_some() => 0,
            None => 1,
        };

        let mut matched = 0;
        for clause in should {
            if self.evaluate(clause)? {
                matched += 1;
            }
        }

        Ok(matched >= required)
    }

    /// Tests a predicate against the field, or against each element when the field is an array.
    fn any_value(&self, field: &str, predicate: impl Fn(&Value) -> bool) -> bool {
        match lookup(self.document, field) {
            Some(Value::Array(values)) => values.iter().any(&predicate),
            Some(value) => predicate(value),
            None => false,
        }
    }

    fn for_each_value(&self, field: &str, mut visit: impl FnMut(&Value)) {
        match lookup(self.document, field) {
            Some(Value::Array(values)) => values.iter().for_each(visit),
            Some(value) => visit(value),
            None => {}
        }
    }
}

/// One parsed term of a `sort` clause.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Parses engine sort clauses: `"field"`, `{"field": "desc"}` or `{"field": {"order": "desc"}}`.
pub(crate) fn parse_sort_clauses(clauses: &[Value]) -> DocumentStoreResult<Vec<SortKey>> {
    clauses
        .iter()
        .map(|clause| {
            let (field, order) = match clause {
                Value::String(field) => (field.as_str(), None),
                Value::Object(_) => {
                    let (field, spec) = single_entry(clause)?;
                    let order = match spec {
                        Value::String(order) => Some(order.as_str()),
                        Value::Object(options) => options.get("order").and_then(Value::as_str),
                        _ => None,
                    };
                    (field, order)
                }
                other => return Err(unsupported(format!("malformed sort clause {other}"))),
            };

            let direction = match order {
                Some(order) if order.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };

            Ok(SortKey { field: field.to_string(), direction })
        })
        .collect()
}

/// Orders two documents by a sort key. Missing values sort last in both directions.
pub(crate) fn compare_by(
    key: &SortKey,
    (left_id, left): (&str, &Document),
    (right_id, right): (&str, &Document),
) -> Ordering {
    let left = sort_value(key, left_id, left);
    let right = sort_value(key, right_id, right);

    match (left, right) {
        (Comparable::Null, Comparable::Null) => Ordering::Equal,
        (Comparable::Null, _) => Ordering::Greater,
        (_, Comparable::Null) => Ordering::Less,
        (left, right) => {
            let ordering = left.partial_cmp(&right).unwrap_or(Ordering::Equal);

            match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

fn sort_value<'a>(key: &SortKey, id: &'a str, document: &'a Document) -> Comparable<'a> {
    if key.field == "_id" {
        return Comparable::String(id);
    }

    match lookup(document, &key.field).map(Comparable::from) {
        // multi-valued fields sort by their smallest (asc) or largest (desc) element
        Some(Comparable::Array(values)) => values
            .into_iter()
            .filter(|value| !matches!(value, Comparable::Null))
            .reduce(|best, value| {
                let better = match key.direction {
                    SortDirection::Asc => value.partial_cmp(&best) == Some(Ordering::Less),
                    SortDirection::Desc => value.partial_cmp(&best) == Some(Ordering::Greater),
                };
                if better { value } else { best }
            })
            .unwrap_or(Comparable::Null),
        Some(value) => value,
        None => Comparable::Null,
    }
}

/// Clauses of a `bool` occurrence type, given either as one object or as an array.
fn clauses<'a>(body: &'a Value, occurrence: &str) -> Vec<&'a Value> {
    match body.get(occurrence) {
        Some(Value::Array(values)) => values.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    }
}

fn single_entry(value: &Value) -> DocumentStoreResult<(&str, &Value)> {
    let object = value
        .as_object()
        .ok_or_else(|| unsupported(format!("expected an object, got {value}")))?;

    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some((key, body)), None) => Ok((key.as_str(), body)),
        _ => Err(unsupported(format!("expected exactly one key in {value}"))),
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn unsupported(reason: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::Backend(format!("parsing_exception: {}", reason.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn matches(query: Value, source: Value) -> bool {
        let source = document(source);

        DocumentEvaluator::new("u1", &source)
            .evaluate(&query)
            .unwrap()
    }

    #[test]
    fn term_and_terms_compare_exact_values() {
        let user = json!({ "status": "active", "tags": ["a", "b"], "age": 30 });

        assert!(matches(json!({ "term": { "status": "active" } }), user.clone()));
        assert!(matches(json!({ "term": { "age": { "value": 30.0 } } }), user.clone()));
        assert!(matches(json!({ "term": { "tags": "b" } }), user.clone()));
        assert!(matches(json!({ "terms": { "status": ["blocked", "active"] } }), user.clone()));
        assert!(!matches(json!({ "term": { "status": "Active" } }), user));
    }

    #[test]
    fn match_is_case_insensitive_on_tokens() {
        let user = json!({ "name": "Tony Stark" });

        assert!(matches(json!({ "match": { "name": "tony" } }), user.clone()));
        assert!(matches(json!({ "match": { "name": "bruce stark" } }), user.clone()));
        assert!(!matches(
            json!({ "match": { "name": { "query": "bruce stark", "operator": "and" } } }),
            user,
        ));
    }

    #[test]
    fn range_handles_numbers_and_dates() {
        let user = json!({ "age": 30, "dateOfBirth": "1990-05-01" });

        assert!(matches(json!({ "range": { "age": { "gte": 30, "lt": 40 } } }), user.clone()));
        assert!(!matches(json!({ "range": { "age": { "gt": 30 } } }), user.clone()));
        assert!(matches(
            json!({ "range": { "dateOfBirth": { "lt": "2000-01-01" } } }),
            user,
        ));
    }

    #[test]
    fn bool_combines_clauses() {
        let user = json!({ "status": "active", "age": 30, "profile": { "city": "Hanoi" } });
        let query = json!({
            "bool": {
                "filter": [{ "term": { "status": "active" } }],
                "must_not": { "exists": { "field": "deletedAt" } },
                "should": [
                    { "term": { "profile.city": "Hanoi" } },
                    { "term": { "profile.city": "Paris" } }
                ],
                "minimum_should_match": 1
            }
        });

        assert!(matches(query, user.clone()));
        assert!(!matches(
            json!({ "bool": { "should": [{ "term": { "status": "blocked" } }] } }),
            user,
        ));
    }

    #[test]
    fn ids_match_the_native_key() {
        assert!(matches(json!({ "ids": { "values": ["u1", "u2"] } }), json!({})));
        assert!(!matches(json!({ "ids": { "values": ["u3"] } }), json!({})));
    }

    #[test]
    fn unknown_queries_are_rejected() {
        let source = document(json!({}));

        let result = DocumentEvaluator::new("u1", &source).evaluate(&json!({ "fuzzy": { "name": "x" } }));

        assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    }

    #[test]
    fn missing_values_sort_last_both_ways() {
        let with = document(json!({ "age": 30 }));
        let without = document(json!({}));

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let key = SortKey { field: "age".to_string(), direction };

            assert_eq!(compare_by(&key, ("a", &with), ("b", &without)), Ordering::Less);
        }
    }

    #[test]
    fn sort_clauses_accept_every_form() {
        let keys = parse_sort_clauses(&[
            json!("name"),
            json!({ "age": "desc" }),
            json!({ "dateOfBirth": { "order": "desc" } }),
        ])
        .unwrap();

        assert_eq!(
            keys.iter().map(|key| key.direction).collect::<Vec<_>>(),
            vec![SortDirection::Asc, SortDirection::Desc, SortDirection::Desc],
        );
    }
}
