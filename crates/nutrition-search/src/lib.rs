//! # Nutrition Search
//!
//! The secondary search index. Documents mirror records from the store and
//! may lag or be missing; the index can always be rebuilt from the store.
//!
//! ## Strategies
//!
//! - `EsSearchIndex`: Elasticsearch over its REST API
//! - `MemoryIndex`: in-process map for tests and local runs

pub mod es_client;
pub mod es_index;
pub mod memory;
pub mod schema;

pub use es_client::*;
pub use es_index::*;
pub use memory::*;
