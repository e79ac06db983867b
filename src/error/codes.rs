//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Collection errors
//! - 2xx: Metadata index errors
//! - 3xx: Config errors
//! - 4xx: Filter errors
//! - 6xx: Storage errors
//! - 8xx: Validation errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `CollectionNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Collection errors (1xx)
    // ========================================
    /// E101: Backing table for the collection does not exist
    CollectionNotFound,
    /// E102: Collection name cannot be mapped to a backing table
    CollectionInvalid,

    // ========================================
    // Metadata index errors (2xx)
    // ========================================
    /// E201: Field definition is malformed or duplicated
    FieldInvalid,
    /// E202: Field has no generated column to query through
    FieldNotIndexed,
    /// E203: The schema engine rejected a statement
    SchemaEngineError,
    /// E204: Some fields in a batch could not be indexed
    IndexPartialFailure,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E301: Config file not found
    ConfigNotFound,
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Filter errors (4xx)
    // ========================================
    /// E401: Filter operator or value is not usable
    FilterInvalid,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E604: SQLite reported an error
    DatabaseError,
    /// E605: JSON encoding or decoding failed
    SerializationError,

    // ========================================
    // Validation errors (8xx)
    // ========================================
    /// E801: Book record failed range validation
    BookInvalid,
    /// E802: Import source could not be read
    ImportFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Unexpected internal error
    InternalError,
    /// E906: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `CollectionNotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::CollectionNotFound => 101,
            Self::CollectionInvalid => 102,

            Self::FieldInvalid => 201,
            Self::FieldNotIndexed => 202,
            Self::SchemaEngineError => 203,
            Self::IndexPartialFailure => 204,

            Self::ConfigNotFound => 301,
            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::FilterInvalid => 401,

            Self::DatabaseError => 604,
            Self::SerializationError => 605,

            Self::BookInvalid => 801,
            Self::ImportFailed => 802,

            Self::InternalError => 901,
            Self::IoError => 906,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::CollectionNotFound => "Run `bookseek collection create` or `bookseek load <file>` first, or check --collection",
            Self::CollectionInvalid => "Collection names may only contain letters, digits and underscores",

            Self::FieldInvalid => "Field names must be identifiers and json paths must look like `$.field`",
            Self::FieldNotIndexed => "Run `bookseek index ensure <field>` to create the generated column",
            Self::SchemaEngineError => "Run `bookseek index status` to inspect the live schema, then retry",
            Self::IndexPartialFailure => "Fix the failing fields and re-run `bookseek index ensure`; completed fields are skipped",

            Self::ConfigNotFound => "Specify --config <path> or create ./bookseek.toml",
            Self::ConfigInvalid => "Check TOML syntax and value types in the config file",
            Self::ConfigMissingRequired => "Set the missing value in the config file or through BOOKSEEK_* variables",

            Self::FilterInvalid => "Use one of eq, ne, gt, ge, lt, le and a value matching the field type",

            Self::DatabaseError => "Check that the database path is writable and not locked by another process",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",

            Self::BookInvalid => "Check rating (0-5), year (1900-2100), and non-negative price and reviews",
            Self::ImportFailed => "Ensure the input is JSON lines with one book object per line",

            Self::InternalError => "An unexpected error occurred. Please report this issue with full error output",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::CollectionNotFound
            | Self::CollectionInvalid
            | Self::FieldInvalid
            | Self::FieldNotIndexed
            | Self::IndexPartialFailure
            | Self::ConfigNotFound
            | Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::FilterInvalid
            | Self::BookInvalid
            | Self::ImportFailed
            | Self::IoError => true,

            Self::SchemaEngineError
            | Self::DatabaseError
            | Self::SerializationError
            | Self::InternalError => false,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "collection",
            2 => "index",
            3 => "config",
            4 => "filter",
            6 => "storage",
            8 => "validation",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::CollectionNotFound,
            Self::CollectionInvalid,
            Self::FieldInvalid,
            Self::FieldNotIndexed,
            Self::SchemaEngineError,
            Self::IndexPartialFailure,
            Self::ConfigNotFound,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::FilterInvalid,
            Self::DatabaseError,
            Self::SerializationError,
            Self::BookInvalid,
            Self::ImportFailed,
            Self::InternalError,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::CollectionNotFound.numeric(), 101);
        assert_eq!(ErrorCode::FieldInvalid.numeric(), 201);
        assert_eq!(ErrorCode::ConfigNotFound.numeric(), 301);
        assert_eq!(ErrorCode::FilterInvalid.numeric(), 401);
        assert_eq!(ErrorCode::DatabaseError.numeric(), 604);
        assert_eq!(ErrorCode::BookInvalid.numeric(), 801);
        assert_eq!(ErrorCode::InternalError.numeric(), 901);
    }

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::CollectionNotFound.code_string(), "E101");
        assert_eq!(ErrorCode::SchemaEngineError.code_string(), "E203");
    }

    #[test]
    fn test_all_codes_have_suggestions_and_categories() {
        for code in ErrorCode::all() {
            assert!(!code.suggestion().is_empty(), "{code:?} has empty suggestion");
            assert_ne!(code.category(), "unknown", "{code:?} has no category");
        }
    }

    #[test]
    fn test_numeric_codes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::all() {
            assert!(seen.insert(code.numeric()), "duplicate numeric code for {code:?}");
        }
    }

    #[test]
    fn test_serialization_is_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::FieldNotIndexed).unwrap();
        assert_eq!(json, "\"FIELD_NOT_INDEXED\"");
    }
}
