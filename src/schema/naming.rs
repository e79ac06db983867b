//! Naming conventions binding collections and metadata fields to live
//! schema objects.
//!
//! Every table, generated column and index name the synchronizer touches is
//! derived here. Nothing else in the crate spells out these prefixes.

use crate::error::{BsError, Result};

/// Prefix of every collection's backing table.
pub const TABLE_PREFIX: &str = "c$v1$";

/// Prefix of the generated column extracted for a metadata field.
pub const GENERATED_COLUMN_PREFIX: &str = "gen_";

/// Prefix of the index created on a field's generated column.
pub const INDEX_PREFIX: &str = "idx_metadata_";

/// Longest field name accepted. Keeps `idx_metadata_<field>` within the
/// 64 character identifier limit of MySQL-compatible engines.
pub const MAX_FIELD_NAME_LEN: usize = 48;

/// Backing table for a collection: `c$v1$<collection>`.
#[must_use]
pub fn table_name(collection: &str) -> String {
    format!("{TABLE_PREFIX}{collection}")
}

/// Inverse of [`table_name`]. Returns `None` for tables that are not
/// collection tables.
#[must_use]
pub fn collection_from_table(table: &str) -> Option<&str> {
    table
        .strip_prefix(TABLE_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Generated column holding a field's extracted value: `gen_<field>`.
#[must_use]
pub fn generated_column_name(field: &str) -> String {
    format!("{GENERATED_COLUMN_PREFIX}{field}")
}

/// Inverse of [`generated_column_name`].
#[must_use]
pub fn field_from_generated_column(column: &str) -> Option<&str> {
    column
        .strip_prefix(GENERATED_COLUMN_PREFIX)
        .filter(|name| is_identifier(name))
}

/// Index on a field's generated column: `idx_metadata_<field>`.
#[must_use]
pub fn index_name(field: &str) -> String {
    format!("{INDEX_PREFIX}{field}")
}

/// `[A-Za-z_][A-Za-z0-9_]*`
#[must_use]
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reject collection names that cannot be embedded in a table name.
pub fn validate_collection_name(collection: &str) -> Result<()> {
    if is_identifier(collection) {
        Ok(())
    } else {
        Err(BsError::InvalidCollection(collection.to_string()))
    }
}

/// Reject field names that cannot be embedded in column and index names.
pub fn validate_field_name(field: &str) -> Result<()> {
    if !is_identifier(field) {
        return Err(BsError::InvalidField {
            field: field.to_string(),
            reason: "field names must match [A-Za-z_][A-Za-z0-9_]*".to_string(),
        });
    }
    if field.len() > MAX_FIELD_NAME_LEN {
        return Err(BsError::InvalidField {
            field: field.to_string(),
            reason: format!("field names are limited to {MAX_FIELD_NAME_LEN} characters"),
        });
    }
    Ok(())
}
