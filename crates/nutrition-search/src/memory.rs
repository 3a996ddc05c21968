//! In-process search index
//!
//! Holds documents in a map keyed by record id and evaluates queries with
//! `SearchQuery::matches`. A reachability switch lets tests simulate a
//! cluster outage; a second switch keeps the index reachable but makes it
//! refuse writes.

use async_trait::async_trait;
use nutrition_core::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory search index (for testing and local runs)
pub struct MemoryIndex {
    docs: RwLock<BTreeMap<i64, IndexDocument>>,
    reachable: AtomicBool,
    rejecting: AtomicBool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
            rejecting: AtomicBool::new(false),
        }
    }

    /// Simulate the cluster going away or coming back
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Keep answering `ping` but fail every write
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Document currently held at `id`
    pub async fn get(&self, id: i64) -> Option<IndexDocument> {
        self.docs.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NutritionError::index("memory index unreachable"))
        }
    }

    fn check_write(&self) -> Result<()> {
        self.check()?;
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(NutritionError::index("memory index rejected the write"));
        }
        Ok(())
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthCheck for MemoryIndex {
    async fn health_check(&self) -> Result<()> {
        self.check()
    }

    fn component_name(&self) -> &'static str {
        "memory_index"
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn ping(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.check()
    }

    async fn index_document(&self, doc: &IndexDocument) -> Result<()> {
        self.check_write()?;
        self.docs.write().await.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn index_documents(&self, docs: &[IndexDocument]) -> Result<BulkIndexResult> {
        self.check_write()?;
        let mut map = self.docs.write().await;
        for doc in docs {
            map.insert(doc.id, doc.clone());
        }
        Ok(BulkIndexResult::success(docs.len()))
    }

    async fn delete_document(&self, id: i64) -> Result<()> {
        self.check_write()?;
        self.docs.write().await.remove(&id);
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Vec<IndexDocument> {
        if self.check().is_err() {
            return Vec::new();
        }
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

        self.docs
            .read()
            .await
            .values()
            .filter(|doc| query.matches(doc))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, code: &str, name: &str) -> IndexDocument {
        NewRecord::new(code, name).into_record(id).to_document()
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let index = MemoryIndex::new();
        index.index_document(&doc(1, "T1", "Rice")).await.unwrap();
        index.index_document(&doc(1, "T1", "Brown Rice")).await.unwrap();
        assert_eq!(index.len().await, 1);
        assert_eq!(index.get(1).await.unwrap().food_name, "Brown Rice");

        index.delete_document(1).await.unwrap();
        index.delete_document(1).await.unwrap();
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_search_filters_and_pages() {
        let index = MemoryIndex::new();
        let docs = vec![
            doc(1, "A1", "Rice"),
            doc(2, "A2", "Rice cake"),
            doc(3, "A3", "Bread"),
        ];
        index.index_documents(&docs).await.unwrap();

        let q = SearchQuery::default().with_food_name("rice");
        assert_eq!(index.search(&q).await.len(), 2);
        assert_eq!(index.search(&q.clone().page(1, 10)).await[0].id, 2);
        assert_eq!(index.search(&SearchQuery::default().page(0, 2)).await.len(), 2);
        assert!(index
            .search(&SearchQuery::default().with_food_code("NOPE"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_rejects_writes_and_hides_reads() {
        let index = MemoryIndex::new();
        index.index_document(&doc(1, "A1", "Rice")).await.unwrap();
        index.set_reachable(false);

        assert!(!index.ping().await);
        assert!(index.index_document(&doc(2, "A2", "Bread")).await.is_err());
        assert!(index.search(&SearchQuery::default()).await.is_empty());

        index.set_reachable(true);
        assert_eq!(index.search(&SearchQuery::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejecting_index_stays_reachable() {
        let index = MemoryIndex::new();
        index.index_document(&doc(1, "A1", "Rice")).await.unwrap();
        index.set_rejecting(true);

        assert!(index.ping().await);
        assert!(index.index_document(&doc(2, "A2", "Bread")).await.unwrap_err().is_index_error());
        assert!(index.index_documents(&[doc(3, "A3", "Soup")]).await.is_err());
        assert!(index.delete_document(1).await.is_err());
        assert_eq!(index.search(&SearchQuery::default()).await.len(), 1);

        index.set_rejecting(false);
        index.delete_document(1).await.unwrap();
        assert!(index.is_empty().await);
    }
}
