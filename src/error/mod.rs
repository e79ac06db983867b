//! Error handling for bookseek.
//!
//! This module provides:
//! - [`BsError`]: The main error enum for all bookseek operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context

mod codes;
mod suggestions;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::schema::engine::EngineError;

pub use codes::ErrorCode;
pub use suggestions::suggest_for_error;

/// Main error type for bookseek operations.
#[derive(Error, Debug)]
pub enum BsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Invalid collection name '{0}'")]
    InvalidCollection(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Field '{field}' has no generated column on collection '{collection}'")]
    FieldNotIndexed { collection: String, field: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid book record: {0}")]
    InvalidBook(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("{failed} of {total} fields failed")]
    PartialFailure { failed: usize, total: usize },
}

impl BsError {
    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::Engine(_) => ErrorCode::SchemaEngineError,
            Self::CollectionNotFound(_) => ErrorCode::CollectionNotFound,
            Self::InvalidCollection(_) => ErrorCode::CollectionInvalid,
            Self::InvalidField { .. } => ErrorCode::FieldInvalid,
            Self::FieldNotIndexed { .. } => ErrorCode::FieldNotIndexed,
            Self::InvalidFilter(_) => ErrorCode::FilterInvalid,
            Self::InvalidBook(_) => ErrorCode::BookInvalid,
            Self::Import(_) => ErrorCode::ImportFailed,
            Self::ConfigNotFound(_) => ErrorCode::ConfigNotFound,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::PartialFailure { .. } => ErrorCode::IndexPartialFailure,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::CollectionNotFound(name) => Some(serde_json::json!({ "collection": name })),
            Self::InvalidField { field, reason } => {
                Some(serde_json::json!({ "field": field, "reason": reason }))
            }
            Self::FieldNotIndexed { collection, field } => {
                Some(serde_json::json!({ "collection": collection, "field": field }))
            }
            Self::Engine(err) => Some(serde_json::json!({ "kind": err.kind, "statement": err.statement })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            Self::PartialFailure { failed, total } => {
                Some(serde_json::json!({ "failed": failed, "total": total }))
            }
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_bs_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "COLLECTION_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    pub recoverable: bool,

    /// Error category (e.g., "collection", "index")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a `BsError`.
    #[must_use]
    pub fn from_bs_error(err: &BsError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.suggestion = suggest_for_error(self.code, self.context.as_ref());
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&BsError> for StructuredError {
    fn from(err: &BsError) -> Self {
        Self::from_bs_error(err)
    }
}

/// Result type alias using `BsError`.
pub type Result<T> = std::result::Result<T, BsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::engine::EngineErrorKind;

    #[test]
    fn test_bs_error_code_mapping() {
        assert_eq!(
            BsError::CollectionNotFound("books".into()).code(),
            ErrorCode::CollectionNotFound
        );
        assert_eq!(BsError::Config("bad".into()).code(), ErrorCode::ConfigInvalid);
        assert_eq!(
            BsError::PartialFailure { failed: 1, total: 7 }.code(),
            ErrorCode::IndexPartialFailure
        );
    }

    #[test]
    fn test_engine_error_context_carries_kind() {
        let err = BsError::from(EngineError::new(
            EngineErrorKind::Other,
            "boom",
            Some("CREATE INDEX x ON t(y)".to_string()),
        ));
        let ctx = err.context().unwrap();
        assert_eq!(ctx["kind"], "other");
        assert_eq!(ctx["statement"], "CREATE INDEX x ON t(y)");
    }

    #[test]
    fn test_structured_error_from_bs_error() {
        let err = BsError::CollectionNotFound("book_info".into());
        let structured = StructuredError::from_bs_error(&err);

        assert_eq!(structured.code, ErrorCode::CollectionNotFound);
        assert_eq!(structured.numeric_code, 101);
        assert!(structured.message.contains("book_info"));
        assert!(structured.suggestion.contains("book_info"));
        assert!(structured.recoverable);
        assert_eq!(structured.category, "collection");
    }

    #[test]
    fn test_structured_error_serialization() {
        let err = StructuredError::new(ErrorCode::FieldInvalid, "bad field");
        let json = serde_json::to_string(&err).unwrap();

        assert!(json.contains("FIELD_INVALID"));
        assert!(json.contains("\"numeric_code\":201"));
        assert!(!json.contains("context"));
    }

    #[test]
    fn test_structured_error_display() {
        let err = StructuredError::new(ErrorCode::FieldNotIndexed, "no column");
        assert_eq!(err.to_string(), "[E202] no column");
    }

    #[test]
    fn test_with_context_regenerates_suggestion() {
        let err = StructuredError::new(ErrorCode::FieldNotIndexed, "no column")
            .with_context(serde_json::json!({ "field": "year" }));
        assert!(err.suggestion.contains("index ensure year"));
    }
}
