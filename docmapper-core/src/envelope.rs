//! Wire types exchanged with the index engine.
//!
//! These mirror the response bodies of the engine's document, search and bulk APIs. Engines
//! deserialize their responses into these types; the repository layer only ever sees them.

use serde::{Deserialize, Serialize};

use crate::codec::Document;

/// Shard acknowledgement counts of a write.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardStats {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub successful: i64,
    #[serde(default)]
    pub failed: i64,
}

/// A stored document together with the engine's metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HitEnvelope {
    #[serde(rename = "_index", default)]
    pub index: String,
    /// Native document key.
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "_seq_no", default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default, skip_serializing_if = "Option::is_none")]
    pub primary_term: Option<i64>,
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Only present on get responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Document>,
}

/// Successful write response.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteAck {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    /// `created`, `updated`, `deleted`, `noop` or `not_found`.
    #[serde(default)]
    pub result: String,
    #[serde(rename = "_shards", default)]
    pub shards: ShardStats,
}

/// Error response of the engine.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejection {
    /// HTTP status of the response.
    pub status: u16,
    /// Engine error type, e.g. `version_conflict_engine_exception`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

impl Rejection {
    pub fn new(status: u16, kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { status, kind: kind.into(), reason: reason.into() }
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Outcome of a single write request as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteReply {
    Acknowledged(WriteAck),
    Rejected(Rejection),
}

/// Total hit count of a search.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalHits {
    pub value: u64,
    /// `eq` when the count is exact, `gte` when it is a lower bound.
    #[serde(default)]
    pub relation: TotalHitsRelation,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TotalHitsRelation {
    #[default]
    Eq,
    Gte,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<HitEnvelope>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    pub hits: SearchHits,
}

/// Result of one item of a bulk request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkItemError>,
}

impl BulkItem {
    /// Whether the engine failed this item.
    ///
    /// A delete of a missing document comes back as `404` with result `not_found` and counts as a
    /// failure.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.status >= 300
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    pub took: u64,
    pub errors: bool,
    pub items: Vec<BulkItem>,
}
