//! # Nutrition Sync
//!
//! Keeps the search index in step with the record store.
//!
//! - `SyncOrchestrator`: commits each mutation to the store, then mirrors it
//!   into the index on a best-effort basis
//! - `Loader`: spreadsheet or CSV bulk import with a single batched index pass
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = SyncOrchestrator::new(Arc::new(store), Arc::new(index));
//! let created = orchestrator.create(NewRecord::new("D001", "Rice")).await?;
//! if !created.sync.is_synced() {
//!     // the record is stored; the index will catch up on the next rebuild
//! }
//! ```

pub mod loader;
pub mod orchestrator;

pub use loader::*;
pub use orchestrator::*;
