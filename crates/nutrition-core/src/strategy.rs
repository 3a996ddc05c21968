//! Gateway traits for the nutrition sync service
//!
//! The two backing systems sit behind these traits so the orchestrator can be
//! wired to a real database and search cluster, or to in-memory doubles.
//!
//! ## Strategy Hierarchy
//!
//! ```text
//! HealthCheck
//!     │
//!     ├── RecordStore (system of record)
//!     │       └── SqlRecordStore
//!     │
//!     └── SearchIndex (best-effort mirror)
//!             └── EsSearchIndex, MemoryIndex
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::SearchQuery;
use crate::record::{IndexDocument, NewRecord, NutritionRecord, RecordPatch};

/// Health check capability
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Perform health check
    ///
    /// Returns Ok(()) if healthy, Err with details if not.
    async fn health_check(&self) -> Result<()>;

    /// Get component name for health reporting
    fn component_name(&self) -> &'static str;
}

// ============================================================================
// Record Store
// ============================================================================

/// Relational system of record
///
/// Every mutating call commits before returning; a returned record has reached
/// durable storage. `food_cd` uniqueness is enforced here by a constraint and
/// surfaced as `NutritionError::Conflict`.
#[async_trait]
pub trait RecordStore: HealthCheck {
    /// Insert a new row; the store assigns the id
    async fn create(&self, record: &NewRecord) -> Result<NutritionRecord>;

    /// Look up by primary key
    async fn get_by_id(&self, id: i64) -> Result<Option<NutritionRecord>>;

    /// Look up by business key
    async fn get_by_code(&self, food_cd: &str) -> Result<Option<NutritionRecord>>;

    /// Page through records in primary-key order
    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<NutritionRecord>>;

    /// Merge the supplied fields into the row at `id`
    async fn update(&self, id: i64, patch: &RecordPatch) -> Result<Option<NutritionRecord>>;

    /// Remove the row at `id`, returning its last state
    async fn delete(&self, id: i64) -> Result<Option<NutritionRecord>>;

    /// Number of live rows
    async fn count(&self) -> Result<u64>;
}

// ============================================================================
// Search Index
// ============================================================================

/// Outcome of a bulk index request
#[derive(Debug, Clone, Default)]
pub struct BulkIndexResult {
    /// Number of documents successfully written
    pub success_count: usize,
    /// Failed document IDs with error messages
    pub failures: Vec<(String, String)>,
}

impl BulkIndexResult {
    /// Create a fully successful result
    pub fn success(count: usize) -> Self {
        Self {
            success_count: count,
            failures: Vec::new(),
        }
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all writes succeeded
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Secondary search index
///
/// A disposable, rebuildable mirror of the record store. Callers probe
/// liveness with `ping` before each mutating call.
#[async_trait]
pub trait SearchIndex: HealthCheck {
    /// Lightweight liveness probe
    async fn ping(&self) -> bool;

    /// Create the backing index with its field mapping if absent
    async fn ensure_schema(&self) -> Result<()>;

    /// Upsert a document at `doc.id`, visible to reads once this returns
    async fn index_document(&self, doc: &IndexDocument) -> Result<()>;

    /// Upsert many documents in one request
    async fn index_documents(&self, docs: &[IndexDocument]) -> Result<BulkIndexResult>;

    /// Remove a document; an already-absent document is not an error
    async fn delete_document(&self, id: i64) -> Result<()>;

    /// Filtered search
    ///
    /// Never fails: an unreachable or missing index yields an empty result.
    async fn search(&self, query: &SearchQuery) -> Vec<IndexDocument>;
}
