//! # Nutrition Core
//!
//! Core types, gateway traits, and utilities for the food nutrition sync service.
//!
//! The relational store is the system of record; the search index is a
//! best-effort mirror that may lag or be missing. This crate defines the
//! seams between them:
//! - Records (stored row, create payload, partial patch, index projection)
//! - Gateways (`RecordStore`, `SearchIndex`)
//! - Search queries (ANDed text/exact clauses)
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────────┐
//!   façade ────► │ SyncOrchestrator │
//!                └───┬──────────┬───┘
//!        commit      │          │  mirror (best-effort)
//!                    ▼          ▼
//!           ┌─────────────┐  ┌─────────────┐
//!           │ RecordStore │  │ SearchIndex │ ◄──── search
//!           └─────────────┘  └─────────────┘
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod record;
pub mod strategy;

pub use config::*;
pub use error::*;
pub use filter::*;
pub use metrics::*;
pub use record::*;
pub use strategy::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::error::{NutritionError, Result};
    pub use crate::filter::{MatchKind, SearchClause, SearchQuery};
    pub use crate::record::{IndexDocument, NewRecord, NutritionRecord, RecordPatch};
    pub use crate::strategy::{BulkIndexResult, HealthCheck, RecordStore, SearchIndex};
}
