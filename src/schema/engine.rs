//! The seam between the synchronizer and a live database.
//!
//! A [`SchemaEngine`] answers introspection queries against the live schema
//! and applies typed [`SchemaChange`]s. The live database is the only source
//! of truth: implementations must not cache schema state between calls.

use serde::Serialize;
use thiserror::Error;

use crate::schema::field::{GeneratedColumnBinding, IndexBinding};

/// Classification of engine failures the synchronizer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// The column or index being created already exists.
    DuplicateObject,
    /// A drop was rejected because another object depends on the target.
    DependentObjectExists,
    /// The column or index being dropped does not exist.
    MissingObject,
    /// The collection's backing table does not exist.
    TableNotFound,
    Other,
}

/// A failure reported by the engine, with the statement that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
    pub statement: Option<String>,
}

impl EngineError {
    #[must_use]
    pub fn new(kind: EngineErrorKind, message: impl Into<String>, statement: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            statement,
        }
    }

    #[must_use]
    pub fn is(&self, kind: EngineErrorKind) -> bool {
        self.kind == kind
    }
}

/// A column as reported by the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub generated: bool,
    /// Generation expression of a generated column, when the engine can
    /// report it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl ColumnInfo {
    /// Whether the column is computed by `expected`. Whitespace and one
    /// level of enclosing parentheses are ignored. A column whose expression
    /// is unknown is taken to match.
    #[must_use]
    pub fn generated_from(&self, expected: &str) -> bool {
        self.expression
            .as_deref()
            .is_none_or(|live| normalize_expression(live) == normalize_expression(expected))
    }
}

fn normalize_expression(expression: &str) -> String {
    let trimmed = expression.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);
    inner.chars().filter(|c| !c.is_whitespace()).collect()
}

/// An index as reported by the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexInfo {
    #[must_use]
    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A single schema mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum SchemaChange {
    AddGeneratedColumn(GeneratedColumnBinding),
    CreateIndex(IndexBinding),
    DropIndex { table: String, index: String },
    DropColumn { table: String, column: String },
}

impl SchemaChange {
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::AddGeneratedColumn(binding) => &binding.table,
            Self::CreateIndex(binding) => &binding.table,
            Self::DropIndex { table, .. } | Self::DropColumn { table, .. } => table,
        }
    }

    /// Name of the column or index this change creates or drops.
    #[must_use]
    pub fn object(&self) -> &str {
        match self {
            Self::AddGeneratedColumn(binding) => &binding.column,
            Self::CreateIndex(binding) => &binding.index,
            Self::DropIndex { index, .. } => index,
            Self::DropColumn { column, .. } => column,
        }
    }
}

/// Live schema access used by the index synchronizer.
pub trait SchemaEngine {
    fn table_exists(&self, table: &str) -> Result<bool, EngineError>;

    /// All columns of `table`, generated ones included.
    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, EngineError>;

    fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>, EngineError>;

    fn apply(&self, change: &SchemaChange) -> Result<(), EngineError>;

    /// The expression this engine generates `binding`'s column from, in the
    /// form [`ColumnInfo::expression`] reports it.
    fn source_expression(&self, binding: &GeneratedColumnBinding) -> String {
        binding.source_expression()
    }
}

impl<T: SchemaEngine + ?Sized> SchemaEngine for &T {
    fn table_exists(&self, table: &str) -> Result<bool, EngineError> {
        (**self).table_exists(table)
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, EngineError> {
        (**self).columns(table)
    }

    fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>, EngineError> {
        (**self).indexes(table)
    }

    fn apply(&self, change: &SchemaChange) -> Result<(), EngineError> {
        (**self).apply(change)
    }

    fn source_expression(&self, binding: &GeneratedColumnBinding) -> String {
        (**self).source_expression(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FieldSpec;

    #[test]
    fn change_reports_table_and_object() {
        let spec = FieldSpec::for_book_field("year");
        let add = SchemaChange::AddGeneratedColumn(spec.column_binding("book_info"));
        assert_eq!(add.table(), "c$v1$book_info");
        assert_eq!(add.object(), "gen_year");

        let drop = SchemaChange::DropIndex {
            table: "c$v1$book_info".into(),
            index: "idx_metadata_year".into(),
        };
        assert_eq!(drop.object(), "idx_metadata_year");
    }

    #[test]
    fn index_covers_column() {
        let info = IndexInfo {
            name: "idx_metadata_year".into(),
            columns: vec!["gen_year".into()],
            unique: false,
        };
        assert!(info.covers("gen_year"));
        assert!(!info.covers("gen_genre"));
    }

    #[test]
    fn generated_from_ignores_layout() {
        let column = ColumnInfo {
            name: "gen_year".into(),
            declared_type: "INT".into(),
            generated: true,
            expression: Some("( metadata  ->> '$.year' )".into()),
        };
        assert!(column.generated_from("metadata ->> '$.year'"));
        assert!(column.generated_from("metadata->>'$.year'"));
        assert!(!column.generated_from("metadata -> '$.year'"));
        assert!(!column.generated_from("metadata ->> '$.price'"));

        let unknown = ColumnInfo { expression: None, ..column };
        assert!(unknown.generated_from("metadata -> '$.anything'"));
    }

    #[test]
    fn engine_error_displays_message() {
        let err = EngineError::new(EngineErrorKind::DuplicateObject, "duplicate column name: gen_year", None);
        assert_eq!(err.to_string(), "duplicate column name: gen_year");
        assert!(err.is(EngineErrorKind::DuplicateObject));
    }
}
