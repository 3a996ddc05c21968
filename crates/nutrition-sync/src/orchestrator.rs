//! Dual-write orchestration
//!
//! Every mutation commits to the record store first. Once the commit returns,
//! the change is durable and the call will succeed; mirroring it into the
//! search index is attempted afterwards and its outcome is reported as a
//! `SyncOutcome` on the result, never as an error.
//!
//! ```text
//! validate ─► uniqueness check ─► store commit ─┬─► index synced
//!                                               ├─► index failed
//!                                               └─► index unreachable
//! ```

use nutrition_core::prelude::*;
use nutrition_core::{ErrorContext, ErrorContextExt, LatencyTimer, SyncMetrics};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a mutation is mirrored into the search index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Mirror right after the store commit
    #[default]
    Mirror,
    /// Store only; the caller mirrors later (bulk import)
    Skip,
}

/// What happened to the index side of a committed mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The index reflects the committed state
    Synced,
    /// The index rejected the write or the call timed out
    Failed,
    /// The liveness check failed; no write was attempted
    Unreachable,
    /// Mirroring was not requested
    Skipped,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Failed => "failed",
            Self::Unreachable => "unreachable",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed mutation and the fate of its index mirror
#[derive(Debug, Clone)]
pub struct Mutation {
    /// Record state after the commit (last state, for deletes)
    pub record: NutritionRecord,
    pub sync: SyncOutcome,
}

/// Counts from a batched index pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    pub indexed: usize,
    pub failed: usize,
    pub sync: SyncOutcome,
}

impl MirrorReport {
    fn empty(sync: SyncOutcome) -> Self {
        Self {
            indexed: 0,
            failed: 0,
            sync,
        }
    }
}

/// Reachability of both backing systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub store: bool,
    pub index: bool,
}

enum MirrorAction<'a> {
    Upsert(&'a NutritionRecord),
    Remove(i64),
}

/// Coordinates the record store and the search index
pub struct SyncOrchestrator {
    store: Arc<dyn RecordStore>,
    index: Arc<dyn SearchIndex>,
    metrics: SyncMetrics,
}

impl SyncOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            store,
            index,
            metrics: SyncMetrics::new("orchestrator"),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    /// Create a record and mirror it
    pub async fn create(&self, input: NewRecord) -> Result<Mutation> {
        self.create_with(input, SyncMode::Mirror).await
    }

    /// Create a record, choosing whether to mirror it now
    pub async fn create_with(&self, input: NewRecord, mode: SyncMode) -> Result<Mutation> {
        let _timer = LatencyTimer::start(|d| self.metrics.record_latency("create", d));
        let result = self.create_inner(input, mode).await;
        self.observe("create", &result);
        result
    }

    async fn create_inner(&self, input: NewRecord, mode: SyncMode) -> Result<Mutation> {
        let input = input.validate()?;
        let ctx = ErrorContext::new("orchestrator", "create").with_food_cd(&input.food_cd);

        if self
            .store
            .get_by_code(&input.food_cd)
            .await
            .with_context(ctx.clone())?
            .is_some()
        {
            return Err::<Mutation, _>(NutritionError::conflict(input.food_cd)).with_context(ctx);
        }

        let record = self.store.create(&input).await.with_context(ctx)?;
        info!(id = record.id, food_cd = %record.food_cd, "Record created");

        let sync = match mode {
            SyncMode::Mirror => self.mirror("create", MirrorAction::Upsert(&record)).await,
            SyncMode::Skip => {
                self.metrics.record_index("create", SyncOutcome::Skipped.as_str());
                SyncOutcome::Skipped
            }
        };
        Ok(Mutation { record, sync })
    }

    /// Apply a partial update and re-mirror the full record
    pub async fn update(&self, id: i64, patch: RecordPatch) -> Result<Mutation> {
        let _timer = LatencyTimer::start(|d| self.metrics.record_latency("update", d));
        let result = self.update_inner(id, patch).await;
        self.observe("update", &result);
        result
    }

    async fn update_inner(&self, id: i64, patch: RecordPatch) -> Result<Mutation> {
        let ctx = ErrorContext::new("orchestrator", "update").with_record_id(id);

        let existing = self
            .store
            .get_by_id(id)
            .await
            .with_context(ctx.clone())?
            .ok_or_else(|| NutritionError::not_found(id))?;
        patch.validate()?;

        if let Some(code) = patch.food_cd().filter(|c| *c != existing.food_cd) {
            let taken = self
                .store
                .get_by_code(code)
                .await
                .with_context(ctx.clone())?
                .is_some_and(|other| other.id != id);
            if taken {
                return Err::<Mutation, _>(NutritionError::conflict(code))
                    .with_context(ctx.with_food_cd(code));
            }
        }

        let record = self
            .store
            .update(id, &patch)
            .await
            .with_context(ctx)?
            .ok_or_else(|| NutritionError::not_found(id))?;
        info!(id, food_cd = %record.food_cd, "Record updated");

        let sync = self.mirror("update", MirrorAction::Upsert(&record)).await;
        Ok(Mutation { record, sync })
    }

    /// Delete a record and remove its document
    pub async fn delete(&self, id: i64) -> Result<Mutation> {
        let _timer = LatencyTimer::start(|d| self.metrics.record_latency("delete", d));
        let result = self.delete_inner(id).await;
        self.observe("delete", &result);
        result
    }

    async fn delete_inner(&self, id: i64) -> Result<Mutation> {
        let ctx = ErrorContext::new("orchestrator", "delete").with_record_id(id);
        let record = self
            .store
            .delete(id)
            .await
            .with_context(ctx)?
            .ok_or_else(|| NutritionError::not_found(id))?;
        info!(id, food_cd = %record.food_cd, "Record deleted");

        let sync = self.mirror("delete", MirrorAction::Remove(id)).await;
        Ok(Mutation { record, sync })
    }

    /// Read one record from the store
    pub async fn get(&self, id: i64) -> Result<NutritionRecord> {
        self.store
            .get_by_id(id)
            .await
            .with_context(ErrorContext::new("orchestrator", "get").with_record_id(id))?
            .ok_or_else(|| NutritionError::not_found(id))
    }

    /// Page through records from the store
    pub async fn list(&self, skip: u64, limit: u64) -> Result<Vec<NutritionRecord>> {
        self.store
            .list(skip, limit)
            .await
            .with_context(ErrorContext::new("orchestrator", "list"))
    }

    /// Filtered lookup against the search index; empty when the index is unavailable
    pub async fn search(&self, query: &SearchQuery) -> Vec<IndexDocument> {
        if !self.index.ping().await {
            warn!("Search index unreachable, returning no results");
            return Vec::new();
        }
        self.index.search(query).await
    }

    /// Mirror many records in one batched request
    pub async fn mirror_all(&self, records: &[NutritionRecord]) -> MirrorReport {
        if records.is_empty() {
            debug!("Nothing to mirror");
            return MirrorReport::empty(SyncOutcome::Synced);
        }
        if !self.index.ping().await {
            warn!(count = records.len(), "Search index unreachable, skipping batch mirror");
            self.metrics.record_index("mirror_all", SyncOutcome::Unreachable.as_str());
            return MirrorReport::empty(SyncOutcome::Unreachable);
        }

        let report = self.mirror_batch(records).await;
        self.metrics.record_index("mirror_all", report.sync.as_str());
        info!(indexed = report.indexed, failed = report.failed, "Batch mirror finished");
        report
    }

    async fn mirror_batch(&self, records: &[NutritionRecord]) -> MirrorReport {
        let docs: Vec<IndexDocument> = records.iter().map(IndexDocument::from).collect();
        match self.index.index_documents(&docs).await {
            Ok(result) => {
                for (id, reason) in result.failures.iter().take(5) {
                    warn!(id = %id, reason = %reason, "Document rejected by index");
                }
                MirrorReport {
                    indexed: result.success_count,
                    failed: result.failure_count(),
                    sync: if result.is_complete_success() {
                        SyncOutcome::Synced
                    } else {
                        SyncOutcome::Failed
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, count = docs.len(), "Bulk index request failed");
                MirrorReport {
                    indexed: 0,
                    failed: docs.len(),
                    sync: SyncOutcome::Failed,
                }
            }
        }
    }

    /// Re-index every stored record, `batch_size` records per bulk request
    ///
    /// Store failures abort the rebuild; an unreachable index is an error
    /// since nothing could be written.
    pub async fn rebuild_index(&self, batch_size: u64) -> Result<MirrorReport> {
        let batch_size = batch_size.max(1);
        if !self.index.ping().await {
            return Err(NutritionError::index("search index unreachable"));
        }
        self.index.ensure_schema().await?;

        let mut report = MirrorReport::empty(SyncOutcome::Synced);
        let mut offset = 0;
        loop {
            let page = self
                .store
                .list(offset, batch_size)
                .await
                .with_context(ErrorContext::new("orchestrator", "rebuild_index"))?;
            if page.is_empty() {
                break;
            }
            offset += page.len() as u64;

            let batch = self.mirror_batch(&page).await;
            report.indexed += batch.indexed;
            report.failed += batch.failed;
            debug!(offset, indexed = report.indexed, "Rebuild progress");
        }

        if report.failed > 0 {
            report.sync = SyncOutcome::Failed;
        }
        self.metrics.record_index("rebuild_index", report.sync.as_str());
        info!(indexed = report.indexed, failed = report.failed, "Index rebuilt");
        Ok(report)
    }

    /// Probe both backing systems
    pub async fn health(&self) -> HealthReport {
        let store = match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, component = self.store.component_name(), "Health check failed");
                false
            }
        };
        HealthReport {
            store,
            index: self.index.ping().await,
        }
    }

    async fn mirror(&self, operation: &'static str, action: MirrorAction<'_>) -> SyncOutcome {
        let outcome = if !self.index.ping().await {
            warn!(operation, "Search index unreachable, mirror skipped");
            SyncOutcome::Unreachable
        } else {
            let (id, result) = match action {
                MirrorAction::Upsert(record) => {
                    (record.id, self.index.index_document(&record.to_document()).await)
                }
                MirrorAction::Remove(id) => (id, self.index.delete_document(id).await),
            };
            match result {
                Ok(()) => {
                    debug!(operation, id, "Index mirrored");
                    SyncOutcome::Synced
                }
                Err(e) => {
                    warn!(operation, id, error = %e, "Index mirror failed");
                    SyncOutcome::Failed
                }
            }
        };

        self.metrics.record_index(operation, outcome.as_str());
        outcome
    }

    fn observe<T>(&self, operation: &'static str, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(e) if e.is_client_error() => "rejected",
            Err(_) => "error",
        };
        self.metrics.record_operation(operation, outcome);
    }
}
