//! Elasticsearch client wrapper
//!
//! Thin REST layer over the handful of ES APIs the mirror needs: liveness,
//! index creation, single-document writes, bulk writes, and search.

use nutrition_core::prelude::*;
use nutrition_core::ElasticsearchConfig;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// Elasticsearch client
pub struct EsClient {
    client: Client,
    config: ElasticsearchConfig,
    host_index: AtomicUsize,
}

impl EsClient {
    /// Create new ES client
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        if config.hosts.is_empty() {
            return Err(NutritionError::config("at least one elasticsearch host is required"));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| NutritionError::index_with_source("Failed to create client", e))?;

        Ok(Self {
            client,
            config,
            host_index: AtomicUsize::new(0),
        })
    }

    /// Get the current host (round-robin for load balancing)
    fn get_host(&self) -> &str {
        let idx = self.host_index.fetch_add(1, Ordering::Relaxed) % self.config.hosts.len();
        &self.config.hosts[idx]
    }

    /// Build request with authentication
    fn build_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.get_host(), path);
        let mut req = self.client.request(method, &url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("ApiKey {}", api_key));
        } else if let (Some(ref user), Some(ref pass)) =
            (&self.config.username, &self.config.password)
        {
            req = req.basic_auth(user, Some(pass));
        }

        req.header("Content-Type", "application/json")
    }

    async fn send(&self, req: reqwest::RequestBuilder, operation: &str) -> Result<reqwest::Response> {
        req.send().await.map_err(|e| transport_error(e, operation, self))
    }

    /// Ping the cluster
    pub async fn ping(&self) -> Result<()> {
        let resp = self
            .send(self.build_request(Method::GET, "/"), "ping")
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NutritionError::index(format!("Ping returned {}", resp.status())))
        }
    }

    /// Check whether an index exists
    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        let path = format!("/{}", index);
        let resp = self
            .send(self.build_request(Method::HEAD, &path), "index_exists")
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(NutritionError::index(format!(
                "Index existence check failed: {}",
                status
            ))),
        }
    }

    /// Create an index with the given body (settings and mappings)
    ///
    /// A concurrent creator winning the race is not an error.
    pub async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let path = format!("/{}", index);
        let resp = self
            .send(self.build_request(Method::PUT, &path).json(body), "create_index")
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && text.contains("resource_already_exists_exception") {
            debug!(index, "Index already exists");
            return Ok(());
        }
        Err(NutritionError::index(format!(
            "Create index failed: {} - {}",
            status, text
        )))
    }

    /// Put a document at `id`, waiting until it is visible to search
    pub async fn put_document(&self, index: &str, id: &str, source: &Value) -> Result<()> {
        let path = format!("/{}/_doc/{}?refresh=wait_for", index, id);
        let resp = self
            .send(self.build_request(Method::PUT, &path).json(source), "put_document")
            .await?;

        if resp.status().is_success() {
            trace!(index, id, "Document written");
            return Ok(());
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(NutritionError::index(format!(
            "Index document failed: {} - {}",
            status, body
        )))
    }

    /// Delete a document; returns `false` when it was already absent
    pub async fn delete_document(&self, index: &str, id: &str) -> Result<bool> {
        let path = format!("/{}/_doc/{}?refresh=wait_for", index, id);
        let resp = self
            .send(self.build_request(Method::DELETE, &path), "delete_document")
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(NutritionError::index(format!(
                    "Delete document failed: {} - {}",
                    status, body
                )))
            }
        }
    }

    /// Run a search body against an index, returning the hit sources
    pub async fn search(&self, index: &str, body: &Value) -> Result<Vec<Value>> {
        let path = format!("/{}/_search", index);
        let resp = self
            .send(self.build_request(Method::POST, &path).json(body), "search")
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(NutritionError::index(format!(
                "Search failed: {} - {}",
                status, body
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| NutritionError::index_with_source("Failed to parse response", e))?;

        let hits = body["hits"]["hits"]
            .as_array()
            .ok_or_else(|| NutritionError::index("Invalid response format"))?;

        Ok(hits
            .iter()
            .filter_map(|hit| hit.get("_source").cloned())
            .collect())
    }

    /// Bulk index documents, refreshing so they are searchable on return
    pub async fn bulk(&self, operations: &[BulkOperation]) -> Result<BulkResponse> {
        if operations.is_empty() {
            return Ok(BulkResponse {
                took: 0,
                errors: false,
                items: Vec::new(),
            });
        }

        let mut body = String::new();
        for op in operations {
            op.write_ndjson(&mut body)?;
        }

        let resp = self
            .send(
                self.build_request(Method::POST, "/_bulk?refresh=true")
                    .header("Content-Type", "application/x-ndjson")
                    .body(body),
                "bulk",
            )
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(NutritionError::index(format!(
                "Bulk failed: {} - {}",
                status, body
            )));
        }

        let response: BulkResponse = resp
            .json()
            .await
            .map_err(|e| NutritionError::index_with_source("Failed to parse response", e))?;

        debug!(
            took = response.took,
            errors = response.errors,
            items = response.items.len(),
            "Bulk operation completed"
        );

        Ok(response)
    }
}

fn transport_error(e: reqwest::Error, operation: &str, client: &EsClient) -> NutritionError {
    if e.is_timeout() {
        let ms = client.config.request_timeout.as_millis().min(u64::MAX as u128) as u64;
        return NutritionError::timeout(operation, ms);
    }
    NutritionError::index_with_source(format!("{} request failed", operation), e)
}

/// Bulk operation
#[derive(Debug, Clone)]
pub enum BulkOperation {
    Index {
        index: String,
        id: String,
        source: Value,
    },
}

impl BulkOperation {
    fn write_ndjson(&self, body: &mut String) -> Result<()> {
        match self {
            Self::Index { index, id, source } => {
                body.push_str(&serde_json::to_string(&json!({
                    "index": { "_index": index, "_id": id }
                }))?);
                body.push('\n');
                body.push_str(&serde_json::to_string(source)?);
                body.push('\n');
            }
        }
        Ok(())
    }
}

/// Bulk response
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    pub took: u64,
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkResponseItem>,
}

impl BulkResponse {
    /// Split the items into a success count and per-document failures
    pub fn into_result(self) -> BulkIndexResult {
        let mut result = BulkIndexResult::default();
        for item in self.items {
            let r = item.operation.result();
            if r.is_success() {
                result.success_count += 1;
            } else {
                let reason = r
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {}", e.error_type, e.reason))
                    .unwrap_or_else(|| format!("status {}", r.status));
                result.failures.push((r.id.clone(), reason));
            }
        }
        result
    }
}

/// Bulk response item
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponseItem {
    #[serde(flatten)]
    pub operation: BulkResponseOperation,
}

/// Bulk response operation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkResponseOperation {
    Index(BulkResponseResult),
}

impl BulkResponseOperation {
    pub fn result(&self) -> &BulkResponseResult {
        match self {
            Self::Index(r) => r,
        }
    }
}

/// Bulk response result
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponseResult {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub error: Option<BulkError>,
}

impl BulkResponseResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Bulk error
#[derive(Debug, Clone, Deserialize)]
pub struct BulkError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reason: String,
}
