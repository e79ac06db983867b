//! Rendering of schema changes to SQL text.
//!
//! Two dialects are supported: SeekDB (MySQL-compatible, the search
//! database the book collections live in) and SQLite (the local engine the
//! `bookseek` binary runs against). Rendering is pure; executing statements
//! is the engine's job.

use std::fmt::Write as _;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::Result;
use crate::schema::engine::SchemaChange;
use crate::schema::field::{FieldSpec, GeneratedColumnBinding};

pub trait Dialect {
    fn name(&self) -> &'static str;

    fn quote_ident(&self, ident: &str) -> String;

    /// Expression computing a generated column from the `metadata` document.
    fn source_expression(&self, binding: &GeneratedColumnBinding) -> String;

    fn render(&self, change: &SchemaChange) -> String;
}

/// MySQL-compatible DDL as accepted by SeekDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeekDbDialect;

impl Dialect for SeekDbDialect {
    fn name(&self) -> &'static str {
        "seekdb"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn source_expression(&self, binding: &GeneratedColumnBinding) -> String {
        binding.source_expression()
    }

    fn render(&self, change: &SchemaChange) -> String {
        match change {
            SchemaChange::AddGeneratedColumn(binding) => format!(
                "ALTER TABLE {} ADD COLUMN {} {} GENERATED ALWAYS AS ({})",
                self.quote_ident(&binding.table),
                self.quote_ident(&binding.column),
                binding.sql_type,
                self.source_expression(binding),
            ),
            SchemaChange::CreateIndex(binding) => format!(
                "CREATE INDEX {} ON {} ({})",
                self.quote_ident(&binding.index),
                self.quote_ident(&binding.table),
                self.quote_ident(&binding.column),
            ),
            SchemaChange::DropIndex { table, index } => format!(
                "DROP INDEX {} ON {}",
                self.quote_ident(index),
                self.quote_ident(table),
            ),
            SchemaChange::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote_ident(table),
                self.quote_ident(column),
            ),
        }
    }
}

/// SQLite DDL. Generated columns added by `ALTER TABLE` must be `VIRTUAL`,
/// and index names live in a database-wide namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn source_expression(&self, binding: &GeneratedColumnBinding) -> String {
        format!(
            "metadata {} '{}'",
            binding.mode.operator(),
            binding.json_path
        )
    }

    fn render(&self, change: &SchemaChange) -> String {
        match change {
            SchemaChange::AddGeneratedColumn(binding) => format!(
                "ALTER TABLE {} ADD COLUMN {} {} GENERATED ALWAYS AS ({}) VIRTUAL",
                self.quote_ident(&binding.table),
                self.quote_ident(&binding.column),
                binding.sql_type,
                self.source_expression(binding),
            ),
            SchemaChange::CreateIndex(binding) => format!(
                "CREATE INDEX {} ON {} ({})",
                self.quote_ident(&binding.index),
                self.quote_ident(&binding.table),
                self.quote_ident(&binding.column),
            ),
            SchemaChange::DropIndex { index, .. } => {
                format!("DROP INDEX {}", self.quote_ident(index))
            }
            SchemaChange::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote_ident(table),
                self.quote_ident(column),
            ),
        }
    }
}

/// Dialect selector for the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Seekdb,
    Sqlite,
}

impl DialectKind {
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Seekdb => &SeekDbDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }
}

/// The statements that bring a fresh collection to the fully indexed state
/// for `specs`, in execution order. With `drop`, the teardown statements
/// instead: each index before its column.
pub fn plan_changes(collection: &str, specs: &[FieldSpec], drop: bool) -> Result<Vec<SchemaChange>> {
    crate::schema::naming::validate_collection_name(collection)?;
    let mut changes = Vec::with_capacity(specs.len() * 2);
    for spec in specs {
        spec.validate()?;
        let column = spec.column_binding(collection);
        let index = spec.index_binding(collection);
        if drop {
            changes.push(SchemaChange::DropIndex {
                table: index.table,
                index: index.index,
            });
            changes.push(SchemaChange::DropColumn {
                table: column.table,
                column: column.column,
            });
        } else {
            changes.push(SchemaChange::AddGeneratedColumn(column));
            changes.push(SchemaChange::CreateIndex(index));
        }
    }
    Ok(changes)
}

/// Render [`plan_changes`] as a script, one commented block per field.
pub fn render_script(
    dialect: &dyn Dialect,
    collection: &str,
    specs: &[FieldSpec],
    drop: bool,
) -> Result<String> {
    let changes = plan_changes(collection, specs, drop)?;
    let mut script = String::new();
    let _ = writeln!(
        script,
        "-- bookseek metadata indexes for collection '{collection}' ({})",
        dialect.name()
    );
    for (spec, pair) in specs.iter().zip(changes.chunks(2)) {
        let _ = writeln!(script);
        let _ = writeln!(
            script,
            "-- {} {} via {}",
            spec.field_name,
            spec.sql_type,
            spec.mode().operator()
        );
        for change in pair {
            let _ = writeln!(script, "{};", dialect.render(change));
        }
    }
    Ok(script)
}
