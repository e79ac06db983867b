//! In-memory [`SchemaEngine`] for testing.
//!
//! Models the parts of a relational catalog the synchronizer relies on:
//! tables with plain and generated columns, and indexes whose names share a
//! single database-wide namespace (as in SQLite). Every `apply` call is
//! recorded, successful or not, so tests can assert statement order.
//!
//! ```rust,ignore
//! use bookseek::test_utils::memory_engine::{ErrorInjection, MemoryEngine};
//!
//! let engine = MemoryEngine::with_collection("book_info");
//! engine.inject_error(ErrorInjection::Object("gen_price".into(), EngineErrorKind::Other));
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::schema::engine::{
    ColumnInfo, EngineError, EngineErrorKind, IndexInfo, SchemaChange, SchemaEngine,
};
use crate::schema::naming;

/// Error injection configuration for testing.
#[derive(Debug, Clone)]
pub enum ErrorInjection {
    /// Fail every `apply` with this kind.
    All(EngineErrorKind),

    /// Fail changes that create or drop the named object.
    Object(String, EngineErrorKind),

    /// Simulate another writer winning a race: the change on the named
    /// object takes effect, but the call reports a duplicate. Fires once.
    ConcurrentCreate(String),
}

#[derive(Debug, Clone)]
struct IndexEntry {
    table: String,
    info: IndexInfo,
}

/// In-memory schema catalog.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: RefCell<BTreeMap<String, Vec<ColumnInfo>>>,
    indexes: RefCell<Vec<IndexEntry>>,
    changes: RefCell<Vec<SchemaChange>>,
    error_on: RefCell<Option<ErrorInjection>>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine holding one collection table.
    #[must_use]
    pub fn with_collection(collection: &str) -> Self {
        let engine = Self::new();
        engine.create_collection(collection);
        engine
    }

    /// Create the backing table of `collection` with its base columns.
    pub fn create_collection(&self, collection: &str) {
        let table = naming::table_name(collection);
        self.create_table(&table);
        for column in ["id", "document", "metadata"] {
            self.add_plain_column(&table, column);
        }
    }

    pub fn create_table(&self, table: &str) {
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default();
    }

    pub fn add_plain_column(&self, table: &str, column: &str) {
        self.push_column(table, column, "TEXT", false, None);
    }

    /// Add a generated column directly, bypassing the change log. Its
    /// expression is reported as unknown.
    pub fn add_generated_column(&self, table: &str, column: &str, declared_type: &str) {
        self.push_column(table, column, declared_type, true, None);
    }

    /// Like [`Self::add_generated_column`], with a known expression.
    pub fn add_generated_column_from(&self, table: &str, column: &str, declared_type: &str, expression: &str) {
        self.push_column(table, column, declared_type, true, Some(expression.to_string()));
    }

    /// Add an index directly, bypassing the change log.
    pub fn add_index(&self, table: &str, index: &str, column: &str) {
        self.indexes.borrow_mut().push(IndexEntry {
            table: table.to_string(),
            info: IndexInfo {
                name: index.to_string(),
                columns: vec![column.to_string()],
                unique: false,
            },
        });
    }

    /// Every change passed to `apply`, in call order.
    pub fn changes(&self) -> Vec<SchemaChange> {
        self.changes.borrow().clone()
    }

    pub fn clear_changes(&self) {
        self.changes.borrow_mut().clear();
    }

    /// Inject an error for testing error handling.
    pub fn inject_error(&self, injection: ErrorInjection) {
        *self.error_on.borrow_mut() = Some(injection);
    }

    /// Clear any injected errors.
    pub fn clear_errors(&self) {
        *self.error_on.borrow_mut() = None;
    }

    fn push_column(
        &self,
        table: &str,
        column: &str,
        declared_type: &str,
        generated: bool,
        expression: Option<String>,
    ) {
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(ColumnInfo {
                name: column.to_string(),
                declared_type: declared_type.to_string(),
                generated,
                expression,
            });
    }

    fn check_error(&self, change: &SchemaChange) -> Result<(), EngineError> {
        let injection = self.error_on.borrow().clone();
        match injection {
            Some(ErrorInjection::All(kind)) => Err(mock_error(kind, change)),
            Some(ErrorInjection::Object(name, kind)) if name == change.object() => {
                Err(mock_error(kind, change))
            }
            Some(ErrorInjection::ConcurrentCreate(name)) if name == change.object() => {
                self.clear_errors();
                // The competing writer's statement lands; ours then collides.
                let _ = self.execute(change);
                Err(EngineError::new(
                    EngineErrorKind::DuplicateObject,
                    format!("{name} already exists"),
                    None,
                ))
            }
            _ => Ok(()),
        }
    }

    fn require_table(&self, table: &str) -> Result<(), EngineError> {
        if self.tables.borrow().contains_key(table) {
            Ok(())
        } else {
            Err(EngineError::new(
                EngineErrorKind::TableNotFound,
                format!("no such table: {table}"),
                None,
            ))
        }
    }

    fn execute(&self, change: &SchemaChange) -> Result<(), EngineError> {
        self.require_table(change.table())?;
        match change {
            SchemaChange::AddGeneratedColumn(binding) => {
                let mut tables = self.tables.borrow_mut();
                let columns = tables.entry(binding.table.clone()).or_default();
                if columns.iter().any(|c| c.name == binding.column) {
                    return Err(EngineError::new(
                        EngineErrorKind::DuplicateObject,
                        format!("duplicate column name: {}", binding.column),
                        None,
                    ));
                }
                columns.push(ColumnInfo {
                    name: binding.column.clone(),
                    declared_type: binding.sql_type.to_string(),
                    generated: true,
                    expression: Some(binding.source_expression()),
                });
                Ok(())
            }
            SchemaChange::CreateIndex(binding) => {
                if self
                    .indexes
                    .borrow()
                    .iter()
                    .any(|entry| entry.info.name == binding.index)
                {
                    return Err(EngineError::new(
                        EngineErrorKind::DuplicateObject,
                        format!("index {} already exists", binding.index),
                        None,
                    ));
                }
                let has_column = self.tables.borrow()[&binding.table]
                    .iter()
                    .any(|c| c.name == binding.column);
                if !has_column {
                    return Err(EngineError::new(
                        EngineErrorKind::MissingObject,
                        format!("no such column: {}", binding.column),
                        None,
                    ));
                }
                self.add_index(&binding.table, &binding.index, &binding.column);
                Ok(())
            }
            SchemaChange::DropIndex { table, index } => {
                let mut indexes = self.indexes.borrow_mut();
                let before = indexes.len();
                indexes.retain(|entry| !(entry.table == *table && entry.info.name == *index));
                if indexes.len() == before {
                    return Err(EngineError::new(
                        EngineErrorKind::MissingObject,
                        format!("no such index: {index}"),
                        None,
                    ));
                }
                Ok(())
            }
            SchemaChange::DropColumn { table, column } => {
                if let Some(entry) = self
                    .indexes
                    .borrow()
                    .iter()
                    .find(|entry| entry.table == *table && entry.info.covers(column))
                {
                    return Err(EngineError::new(
                        EngineErrorKind::DependentObjectExists,
                        format!("column {column} is used by index {}", entry.info.name),
                        None,
                    ));
                }
                let mut tables = self.tables.borrow_mut();
                let columns = tables.entry(table.clone()).or_default();
                let before = columns.len();
                columns.retain(|c| c.name != *column);
                if columns.len() == before {
                    return Err(EngineError::new(
                        EngineErrorKind::MissingObject,
                        format!("no such column: {column}"),
                        None,
                    ));
                }
                Ok(())
            }
        }
    }
}

fn mock_error(kind: EngineErrorKind, change: &SchemaChange) -> EngineError {
    EngineError::new(kind, format!("mock error: {}", change.object()), None)
}

impl SchemaEngine for MemoryEngine {
    fn table_exists(&self, table: &str) -> Result<bool, EngineError> {
        Ok(self.tables.borrow().contains_key(table))
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, EngineError> {
        self.require_table(table)?;
        Ok(self.tables.borrow()[table].clone())
    }

    fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>, EngineError> {
        self.require_table(table)?;
        Ok(self
            .indexes
            .borrow()
            .iter()
            .filter(|entry| entry.table == table)
            .map(|entry| entry.info.clone())
            .collect())
    }

    fn apply(&self, change: &SchemaChange) -> Result<(), EngineError> {
        self.changes.borrow_mut().push(change.clone());
        self.check_error(change)?;
        self.execute(change)
    }
}
