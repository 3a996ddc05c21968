//! `SearchIndex` over an Elasticsearch cluster
//!
//! The index and its mapping are created before the first document write.
//! Writing into a missing index would let the cluster create it with a
//! dynamic mapping, turning the keyword fields into analyzed text.

use async_trait::async_trait;
use nutrition_core::prelude::*;
use nutrition_core::{ConnectionMetrics, ElasticsearchConfig, SearchMetrics};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::es_client::{BulkOperation, EsClient};
use crate::schema;

/// Elasticsearch-backed search index
pub struct EsSearchIndex {
    client: EsClient,
    index: String,
    schema_ready: OnceCell<()>,
    search_metrics: SearchMetrics,
    connection: ConnectionMetrics,
}

impl EsSearchIndex {
    /// Build the index gateway; no network traffic happens here
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let index = config.index.clone();
        Ok(Self {
            client: EsClient::new(config)?,
            index,
            schema_ready: OnceCell::new(),
            search_metrics: SearchMetrics::new("elasticsearch"),
            connection: ConnectionMetrics::new("elasticsearch"),
        })
    }

    /// Name of the backing index
    pub fn index_name(&self) -> &str {
        &self.index
    }

    async fn create_if_missing(&self) -> Result<()> {
        if self.client.index_exists(&self.index).await? {
            debug!(index = %self.index, "Index present");
            return Ok(());
        }
        self.client
            .create_index(&self.index, &schema::index_body())
            .await?;
        info!(index = %self.index, "Created index with mapping");
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for EsSearchIndex {
    async fn health_check(&self) -> Result<()> {
        self.client.ping().await
    }

    fn component_name(&self) -> &'static str {
        "search_index"
    }
}

#[async_trait]
impl SearchIndex for EsSearchIndex {
    async fn ping(&self) -> bool {
        let reachable = match self.client.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Search cluster unreachable");
                false
            }
        };
        self.connection.set_connected(reachable);
        reachable
    }

    /// Checked once per process; a failed attempt is retried on the next call
    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| self.create_if_missing())
            .await?;
        Ok(())
    }

    async fn index_document(&self, doc: &IndexDocument) -> Result<()> {
        self.ensure_schema().await?;
        let source = doc.to_source()?;
        self.client
            .put_document(&self.index, &doc.doc_id(), &source)
            .await
    }

    async fn index_documents(&self, docs: &[IndexDocument]) -> Result<BulkIndexResult> {
        self.ensure_schema().await?;
        let operations = docs
            .iter()
            .map(|doc| {
                Ok(BulkOperation::Index {
                    index: self.index.clone(),
                    id: doc.doc_id(),
                    source: doc.to_source()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let result = self.client.bulk(&operations).await?.into_result();
        if !result.is_complete_success() {
            warn!(
                success = result.success_count,
                failed = result.failure_count(),
                "Bulk index finished with failures"
            );
        }
        Ok(result)
    }

    async fn delete_document(&self, id: i64) -> Result<()> {
        let id = id.to_string();
        if !self.client.delete_document(&self.index, &id).await? {
            debug!(id = %id, index = %self.index, "Document not in index");
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Vec<IndexDocument> {
        let body = schema::query_body(query);
        let hits = match self.client.search(&self.index, &body).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, index = %self.index, "Search failed, returning no results");
                self.search_metrics.record_search("error", 0);
                return Vec::new();
            }
        };

        let docs: Vec<IndexDocument> = hits
            .into_iter()
            .filter_map(|source| match serde_json::from_value(source) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed search hit");
                    None
                }
            })
            .collect();

        self.search_metrics.record_search("ok", docs.len());
        docs
    }
}
