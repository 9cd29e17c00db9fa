use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{collections::HashMap, time::Duration};
use tracing::debug;

use docmapper_core::{
    codec::Document,
    engine::{EngineBuilder, IndexEngine},
    envelope::{BulkItem, BulkResponse, HitEnvelope, Rejection, SearchResponse, WriteAck, WriteReply},
    error::{DocumentStoreError, DocumentStoreResult},
    query::SearchRequest,
};

use crate::config::ElasticsearchConfig;

const NDJSON: &str = "application/x-ndjson";

/// Index engine speaking the Elasticsearch REST API.
///
/// Engine refusals (`4xx`) come back as [`WriteReply::Rejected`]; connection failures and
/// server errors (`5xx`) are [`DocumentStoreError::Transport`].
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
    refresh: bool,
}

/// Raw bulk response: every item is keyed by its action name.
#[derive(Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    took: u64,
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

impl ElasticsearchStore {
    pub fn new(client: Client, config: &ElasticsearchConfig) -> DocumentStoreResult<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| DocumentStoreError::Initialization(format!("invalid url {}: {e}", config.url)))?;

        if base_url.cannot_be_a_base() {
            return Err(DocumentStoreError::Initialization(format!(
                "url {} cannot be used as a base",
                config.url
            )));
        }

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            refresh: config.refresh,
        })
    }

    pub fn builder(url: &str) -> ElasticsearchStoreBuilder {
        ElasticsearchStoreBuilder::new(url)
    }

    fn endpoint(&self, segments: &[&str], refresh: bool) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if refresh && self.refresh {
            url.query_pairs_mut().append_pair("refresh", "true");
        }

        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "elasticsearch request");

        let builder = self.client.request(method, url);

        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> DocumentStoreResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| DocumentStoreError::Transport(e.to_string()))?;

        if response.status().is_server_error() {
            let status = response.status();
            let rejection = Self::rejection(response).await;

            return Err(DocumentStoreError::Transport(format!(
                "{status}: {}: {}",
                rejection.kind, rejection.reason
            )));
        }

        Ok(response)
    }

    async fn json<T: for<'de> Deserialize<'de>>(response: Response) -> DocumentStoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| DocumentStoreError::Decode(e.to_string()))
    }

    /// Reads an error response body into a rejection.
    ///
    /// Handles the structured `{"error": {"type", "reason"}, "status"}` form, string errors and
    /// write responses such as `{"result": "not_found"}`.
    async fn rejection(response: Response) -> Rejection {
        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!(status, error = %e, "failed to read error response body");
                String::new()
            }
        };
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);

        let (kind, reason) = match body.get("error") {
            Some(Value::Object(cause)) => (
                cause.get("type").and_then(Value::as_str).unwrap_or_default().to_string(),
                cause.get("reason").and_then(Value::as_str).unwrap_or_default().to_string(),
            ),
            Some(Value::String(message)) => (String::new(), message.clone()),
            _ => (
                body.get("result").and_then(Value::as_str).unwrap_or_default().to_string(),
                text,
            ),
        };

        Rejection::new(status, kind, reason)
    }

    async fn write_reply(response: Response) -> DocumentStoreResult<WriteReply> {
        if response.status().is_success() {
            return Ok(WriteReply::Acknowledged(Self::json::<WriteAck>(response).await?));
        }

        let rejection = Self::rejection(response).await;
        debug!(status = rejection.status, kind = %rejection.kind, reason = %rejection.reason, "write rejected");

        Ok(WriteReply::Rejected(rejection))
    }

    async fn failure(response: Response) -> DocumentStoreError {
        let rejection = Self::rejection(response).await;

        DocumentStoreError::Backend(format!(
            "{} {}: {}",
            rejection.status, rejection.kind, rejection.reason
        ))
    }
}

#[async_trait]
impl IndexEngine for ElasticsearchStore {
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<HitEnvelope>> {
        let url = self.endpoint(&[index, "_doc", id], false);
        let response = self.send(self.request(Method::GET, url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(Self::json::<HitEnvelope>(response).await?)),
            _ => Err(Self::failure(response).await),
        }
    }

    async fn document_exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        let url = self.endpoint(&[index, "_doc", id], false);
        let response = self.send(self.request(Method::HEAD, url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(DocumentStoreError::Backend(format!("unexpected status {status} for exists"))),
        }
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        body: Document,
    ) -> DocumentStoreResult<WriteReply> {
        let builder = match id {
            Some(id) => self.request(Method::PUT, self.endpoint(&[index, "_create", id], true)),
            None => self.request(Method::POST, self.endpoint(&[index, "_doc"], true)),
        };

        let response = self.send(builder.json(&body)).await?;

        Self::write_reply(response).await
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        let url = self.endpoint(&[index, "_update", id], true);
        let response = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;

        Self::write_reply(response).await
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> DocumentStoreResult<WriteReply> {
        let url = self.endpoint(&[index, "_doc", id], true);
        let response = self
            .send(self.request(Method::PUT, url).json(&body))
            .await?;

        Self::write_reply(response).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<WriteReply> {
        let url = self.endpoint(&[index, "_doc", id], false);
        let response = self.send(self.request(Method::DELETE, url)).await?;

        Self::write_reply(response).await
    }

    async fn search(&self, index: &str, request: SearchRequest) -> DocumentStoreResult<SearchResponse> {
        let url = self.endpoint(&[index, "_search"], false);
        let response = self
            .send(self.request(Method::POST, url).json(&request.to_body()))
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        Self::json::<SearchResponse>(response).await
    }

    async fn bulk_delete(&self, index: &str, ids: Vec<String>) -> DocumentStoreResult<BulkResponse> {
        if ids.is_empty() {
            return Ok(BulkResponse::default());
        }

        let mut body = String::new();
        for id in &ids {
            body.push_str(&json!({ "delete": { "_index": index, "_id": id } }).to_string());
            body.push('\n');
        }

        let url = self.endpoint(&["_bulk"], false);
        let response = self
            .send(
                self.request(Method::POST, url)
                    .header(CONTENT_TYPE, NDJSON)
                    .body(body),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let raw = Self::json::<RawBulkResponse>(response).await?;
        debug!(index, count = ids.len(), errors = raw.errors, took = raw.took, "bulk delete answered");

        Ok(BulkResponse {
            took: raw.took,
            errors: raw.errors,
            items: raw
                .items
                .into_iter()
                .flat_map(HashMap::into_values)
                .collect(),
        })
    }

    async fn create_index(&self, index: &str) -> DocumentStoreResult<()> {
        let url = self.endpoint(&[index], false);
        let response = self.send(self.request(Method::PUT, url)).await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        Ok(())
    }

    async fn drop_index(&self, index: &str) -> DocumentStoreResult<()> {
        let url = self.endpoint(&[index], false);
        let response = self.send(self.request(Method::DELETE, url)).await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        Ok(())
    }
}

/// Builder for constructing [`ElasticsearchStore`] instances.
#[derive(Debug, Clone, Default)]
pub struct ElasticsearchStoreBuilder {
    config: ElasticsearchConfig,
}

impl ElasticsearchStoreBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            config: ElasticsearchConfig {
                url: url.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn from_config(config: ElasticsearchConfig) -> Self {
        Self { config }
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.config.username = Some(username.to_string());
        self.config.password = Some(password.to_string());
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Whether document writes wait for a refresh (`?refresh=true`).
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.config.refresh = refresh;
        self
    }
}

#[async_trait]
impl EngineBuilder for ElasticsearchStoreBuilder {
    type Engine = ElasticsearchStore;

    async fn build(self) -> DocumentStoreResult<Self::Engine> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        ElasticsearchStore::new(client, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(url: &str, refresh: bool) -> ElasticsearchStore {
        let config = ElasticsearchConfig { url: url.to_string(), refresh, ..Default::default() };

        ElasticsearchStore::new(Client::new(), &config).unwrap()
    }

    #[test]
    fn endpoints_encode_ids_and_keep_base_path() {
        let store = store("http://es.local:9200/cluster/", true);

        assert_eq!(
            store.endpoint(&["users", "_doc", "a/b c"], false).as_str(),
            "http://es.local:9200/cluster/users/_doc/a%2Fb%20c",
        );
        assert_eq!(
            store.endpoint(&["users", "_create", "u1"], true).as_str(),
            "http://es.local:9200/cluster/users/_create/u1?refresh=true",
        );
    }

    #[test]
    fn refresh_can_be_disabled() {
        let store = store("http://es.local:9200", false);

        assert_eq!(
            store.endpoint(&["users", "_update", "u1"], true).as_str(),
            "http://es.local:9200/users/_update/u1",
        );
    }

    #[test]
    fn invalid_url_fails_construction() {
        let config = ElasticsearchConfig { url: "not a url".to_string(), ..Default::default() };

        assert!(matches!(
            ElasticsearchStore::new(Client::new(), &config),
            Err(DocumentStoreError::Initialization(_)),
        ));
    }
}
