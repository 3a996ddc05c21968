//! Error types for the nutrition sync service
//!
//! Uses `thiserror` for ergonomic error handling with full context preservation.
//! Store-layer errors are fatal to an operation; index-layer errors are always
//! recovered by the orchestrator and never reach an API caller.

use std::fmt;
use thiserror::Error;

/// Result type alias for nutrition operations
pub type Result<T> = std::result::Result<T, NutritionError>;

/// Primary error type for all nutrition operations
#[derive(Error, Debug)]
pub enum NutritionError {
    /// Missing or blank required field, rejected before any write
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Duplicate business key, rejected before (or by) the store write
    #[error("FoodNutrition with food_cd '{food_cd}' already exists.")]
    Conflict { food_cd: String },

    /// No record at the requested id
    #[error("FoodNutrition with id {id} not found")]
    NotFound { id: i64 },

    /// Relational store failure
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Search index unreachable, timed out, or rejected the write
    #[error("Index sync error: {message}")]
    IndexSync {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Payload serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timeout
    #[error("Timeout: {operation} exceeded {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },
}

impl NutritionError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a conflict error for a duplicate food code
    pub fn conflict(food_cd: impl Into<String>) -> Self {
        Self::Conflict {
            food_cd: food_cd.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(id: i64) -> Self {
        Self::NotFound { id }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error with source
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an index sync error
    pub fn index(message: impl Into<String>) -> Self {
        Self::IndexSync {
            message: message.into(),
            source: None,
        }
    }

    /// Create an index sync error with source
    pub fn index_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::IndexSync {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Check if the error originates from the search index side
    pub fn is_index_error(&self) -> bool {
        matches!(self, Self::IndexSync { .. } | Self::Timeout { .. })
    }

    /// Check if the error is the caller's fault (bad input or missing record)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Conflict { .. } | Self::NotFound { .. }
        )
    }
}

impl From<serde_json::Error> for NutritionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

/// Error context for enhanced debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub component: &'static str,
    pub operation: String,
    pub record_id: Option<i64>,
    pub food_cd: Option<String>,
}

impl ErrorContext {
    pub fn new(component: &'static str, operation: impl Into<String>) -> Self {
        Self {
            component,
            operation: operation.into(),
            record_id: None,
            food_cd: None,
        }
    }

    pub fn with_record_id(mut self, id: i64) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn with_food_cd(mut self, food_cd: impl Into<String>) -> Self {
        self.food_cd = Some(food_cd.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}::{}]", self.component, self.operation)?;
        if let Some(id) = self.record_id {
            write!(f, " id={}", id)?;
        }
        if let Some(ref code) = self.food_cd {
            write!(f, " food_cd={}", code)?;
        }
        Ok(())
    }
}

/// Extension trait for adding context to errors
pub trait ErrorContextExt<T> {
    fn with_context(self, ctx: ErrorContext) -> Result<T>;
}

impl<T> ErrorContextExt<T> for Result<T> {
    fn with_context(self, ctx: ErrorContext) -> Result<T> {
        self.map_err(|e| {
            if e.is_client_error() {
                tracing::debug!(error = %e, context = %ctx, "Operation rejected");
            } else {
                tracing::error!(
                    error = %e,
                    component = ctx.component,
                    operation = %ctx.operation,
                    record_id = ?ctx.record_id,
                    food_cd = ?ctx.food_cd,
                    "Operation failed"
                );
            }
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(NutritionError::conflict("T1").is_client_error());
        assert!(NutritionError::not_found(7).is_client_error());
        assert!(NutritionError::validation("food_cd is required").is_client_error());
        assert!(!NutritionError::store("disk full").is_client_error());

        assert!(NutritionError::index("unreachable").is_index_error());
        assert!(NutritionError::timeout("index_document", 30_000).is_index_error());
        assert!(!NutritionError::store("locked").is_index_error());
    }

    #[test]
    fn test_messages_name_the_key() {
        assert_eq!(
            NutritionError::conflict("T1").to_string(),
            "FoodNutrition with food_cd 'T1' already exists."
        );
        assert_eq!(
            NutritionError::not_found(99999).to_string(),
            "FoodNutrition with id 99999 not found"
        );
    }

    #[test]
    fn test_context_display() {
        let ctx = ErrorContext::new("orchestrator", "update")
            .with_record_id(3)
            .with_food_cd("D001");
        assert_eq!(ctx.to_string(), "[orchestrator::update] id=3 food_cd=D001");
    }
}
