//! Collection tables: lifecycle, document import and metadata filtering.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::books::BookRecord;
use crate::error::{BsError, Result};
use crate::schema::dialect::{Dialect, SqliteDialect};
use crate::schema::engine::SchemaEngine;
use crate::schema::field::{ExtractionMode, FieldSpec, SqlType};
use crate::schema::naming;
use crate::schema::sqlite::SqliteEngine;

/// Comparison operator for [`CollectionStore::filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterOp {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" | "=" | "==" => Ok(Self::Eq),
            "ne" | "!=" | "<>" => Ok(Self::Ne),
            "gt" | ">" => Ok(Self::Gt),
            "ge" | "gte" | ">=" => Ok(Self::Ge),
            "lt" | "<" => Ok(Self::Lt),
            "le" | "lte" | "<=" => Ok(Self::Le),
            other => Err(format!(
                "unknown operator '{other}' (expected eq, ne, gt, ge, lt, le)"
            )),
        }
    }
}

/// Result of [`CollectionStore::add_books`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub batches: usize,
}

/// A row returned by [`CollectionStore::filter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredBook {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Value,
}

/// Bind value for a comparison against a generated column.
///
/// `->` columns hold JSON text, so the value is JSON-encoded: `Fiction`
/// becomes `"Fiction"`, while `2015` stays `2015`. `->>` columns hold SQL
/// scalars of the declared type.
pub fn parse_filter_value(spec: &FieldSpec, raw: &str) -> Result<SqlValue> {
    match spec.mode() {
        ExtractionMode::AsJson => {
            let value = match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(value) => value,
                Err(_) => serde_json::Value::String(raw.to_string()),
            };
            Ok(SqlValue::Text(value.to_string()))
        }
        ExtractionMode::AsScalar => {
            let invalid = || {
                BsError::InvalidFilter(format!(
                    "'{raw}' is not a valid {} value for field '{}'",
                    spec.sql_type, spec.field_name
                ))
            };
            let raw = raw.trim();
            match spec.sql_type {
                SqlType::Int | SqlType::BigInt => {
                    raw.parse::<i64>().map(SqlValue::Integer).map_err(|_| invalid())
                }
                SqlType::Float | SqlType::Double => {
                    raw.parse::<f64>().map(SqlValue::Real).map_err(|_| invalid())
                }
                SqlType::Varchar(_) => Ok(SqlValue::Text(raw.to_string())),
            }
        }
    }
}

/// Collection tables on one connection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionStore<'c> {
    conn: &'c Connection,
}

impl<'c> CollectionStore<'c> {
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create the collection's table. Returns `false` when it already
    /// existed and `recreate` was not set.
    pub fn create_collection(&self, name: &str, recreate: bool) -> Result<bool> {
        naming::validate_collection_name(name)?;
        if recreate {
            self.delete_collection(name)?;
        } else if self.exists(name)? {
            debug!(collection = name, "collection already exists");
            return Ok(false);
        }

        let sql = format!(
            "CREATE TABLE {} (
                 id TEXT PRIMARY KEY,
                 document TEXT NOT NULL,
                 metadata TEXT NOT NULL CHECK (json_valid(metadata))
             )",
            quoted_table(name)
        );
        self.conn.execute(&sql, [])?;
        info!(collection = name, "collection created");
        Ok(true)
    }

    /// Drop the collection's table along with its generated columns and
    /// indexes. Returns `false` if there was nothing to drop.
    pub fn delete_collection(&self, name: &str) -> Result<bool> {
        naming::validate_collection_name(name)?;
        if !self.exists(name)? {
            return Ok(false);
        }
        self.conn
            .execute(&format!("DROP TABLE {}", quoted_table(name)), [])?;
        info!(collection = name, "collection deleted");
        Ok(true)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(SqliteEngine::new(self.conn).table_exists(&naming::table_name(name))?)
    }

    /// Names of all collections, sorted.
    pub fn list_collections(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, ?1) = ?2 ORDER BY name",
        )?;
        let prefix = naming::TABLE_PREFIX;
        let rows = stmt.query_map(params![prefix.len() as i64, prefix], |row| {
            row.get::<_, String>(0)
        })?;
        let mut names = Vec::new();
        for row in rows {
            let table = row?;
            if let Some(name) = naming::collection_from_table(&table) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    pub fn count(&self, name: &str) -> Result<u64> {
        self.require(name)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT count(*) FROM {}", quoted_table(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Insert records in batches of `batch_size`, one transaction per batch.
    ///
    /// A batch that fails is rolled back and retried row by row; rows that
    /// still fail (e.g. duplicate ids) are skipped and counted.
    pub fn add_books(&self, name: &str, records: &[BookRecord], batch_size: usize) -> Result<ImportSummary> {
        self.require(name)?;
        let sql = format!(
            "INSERT INTO {} (id, document, metadata) VALUES (?1, ?2, ?3)",
            quoted_table(name)
        );

        let mut summary = ImportSummary::default();
        for batch in records.chunks(batch_size.max(1)) {
            summary.batches += 1;
            let rows = batch
                .iter()
                .map(|record| Ok((record, serde_json::to_string(&record.metadata)?)))
                .collect::<Result<Vec<_>>>()?;

            let tx = self.conn.unchecked_transaction()?;
            let batch_result = rows.iter().try_for_each(|(record, metadata)| {
                tx.execute(&sql, params![record.id, record.document, metadata])
                    .map(|_| ())
            });
            match batch_result {
                Ok(()) => {
                    tx.commit()?;
                    summary.inserted += rows.len();
                }
                Err(err) => {
                    tx.rollback()?;
                    warn!(collection = name, batch = summary.batches, error = %err, "batch failed, inserting rows individually");
                    for (record, metadata) in &rows {
                        match self
                            .conn
                            .execute(&sql, params![record.id, record.document, metadata])
                        {
                            Ok(_) => summary.inserted += 1,
                            Err(err) => {
                                warn!(collection = name, id = %record.id, error = %err, "skipping record");
                                summary.skipped += 1;
                            }
                        }
                    }
                }
            }
            debug!(collection = name, batch = summary.batches, inserted = summary.inserted, "batch done");
        }

        info!(
            collection = name,
            inserted = summary.inserted,
            skipped = summary.skipped,
            batches = summary.batches,
            "books imported"
        );
        Ok(summary)
    }

    /// Rows whose generated column for `spec` compares true against `value`,
    /// ordered by that column.
    pub fn filter(
        &self,
        name: &str,
        spec: &FieldSpec,
        op: FilterOp,
        value: &str,
        limit: usize,
    ) -> Result<Vec<StoredBook>> {
        let sql = self.filter_sql(name, spec, op)?;
        let bound = parse_filter_value(spec, value)?;
        debug!(collection = name, field = %spec.field_name, %op, sql = %sql, "filtering");

        let mut stmt = self.conn.prepare(&sql)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![bound, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut books = Vec::new();
        for row in rows {
            let (id, document, metadata) = row?;
            books.push(StoredBook {
                id,
                document,
                metadata: serde_json::from_str(&metadata)?,
            });
        }
        Ok(books)
    }

    /// `EXPLAIN QUERY PLAN` detail lines for the query [`Self::filter`] runs.
    pub fn query_plan(&self, name: &str, spec: &FieldSpec, op: FilterOp) -> Result<Vec<String>> {
        let sql = format!("EXPLAIN QUERY PLAN {}", self.filter_sql(name, spec, op)?);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![SqlValue::Null, 1_i64], |row| row.get::<_, String>(3))?;
        let mut details = Vec::new();
        for row in rows {
            details.push(row?);
        }
        Ok(details)
    }

    fn filter_sql(&self, name: &str, spec: &FieldSpec, op: FilterOp) -> Result<String> {
        spec.validate()?;
        self.require(name)?;
        let table = naming::table_name(name);
        let column = naming::generated_column_name(&spec.field_name);
        let engine = SqliteEngine::new(self.conn);
        let Some(live) = engine
            .columns(&table)?
            .into_iter()
            .find(|c| c.generated && c.name == column)
        else {
            return Err(BsError::FieldNotIndexed {
                collection: name.to_string(),
                field: spec.field_name.clone(),
            });
        };
        // Values are bound for the spec's extraction mode, which must be the
        // one the column was built with.
        let expected = engine.source_expression(&spec.column_binding(name));
        if !live.generated_from(&expected) {
            return Err(BsError::InvalidFilter(format!(
                "{column} is generated from {}, not {expected}; rebuild the field first",
                live.expression.as_deref().unwrap_or_default()
            )));
        }

        let column = SqliteDialect.quote_ident(&column);
        Ok(format!(
            "SELECT id, document, metadata FROM {} WHERE {column} {} ?1 ORDER BY {column}, id LIMIT ?2",
            SqliteDialect.quote_ident(&table),
            op.sql(),
        ))
    }

    fn require(&self, name: &str) -> Result<()> {
        naming::validate_collection_name(name)?;
        if self.exists(name)? {
            Ok(())
        } else {
            Err(BsError::CollectionNotFound(name.to_string()))
        }
    }
}

fn quoted_table(name: &str) -> String {
    SqliteDialect.quote_ident(&naming::table_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::BookMetadata;

    fn book(id: &str, name: &str, year: i64, genre: &str) -> BookRecord {
        BookRecord {
            id: id.to_string(),
            document: format!("{name} Someone"),
            metadata: BookMetadata::new(name, "Someone", 4.5, 10, 9.99, year, genre).unwrap(),
        }
    }

    fn store_with_books(conn: &Connection) -> CollectionStore<'_> {
        let store = CollectionStore::new(conn);
        store.create_collection("book_info", false).unwrap();
        let books = vec![
            book("0", "Dune", 2019, "Fiction"),
            book("1", "Sapiens", 2015, "Non Fiction"),
            book("2", "The Martian", 2015, "Fiction"),
        ];
        store.add_books("book_info", &books, 2).unwrap();
        store
    }

    #[test]
    fn create_is_idempotent_and_recreate_empties() {
        let conn = Connection::open_in_memory().unwrap();
        let store = store_with_books(&conn);
        assert!(!store.create_collection("book_info", false).unwrap());
        assert_eq!(store.count("book_info").unwrap(), 3);

        assert!(store.create_collection("book_info", true).unwrap());
        assert_eq!(store.count("book_info").unwrap(), 0);
    }

    #[test]
    fn list_strips_prefix_and_ignores_other_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE unrelated (x)", []).unwrap();
        let store = CollectionStore::new(&conn);
        store.create_collection("b_books", false).unwrap();
        store.create_collection("a_books", false).unwrap();
        assert_eq!(store.list_collections().unwrap(), vec!["a_books", "b_books"]);

        assert!(store.delete_collection("a_books").unwrap());
        assert!(!store.delete_collection("a_books").unwrap());
        assert_eq!(store.list_collections().unwrap(), vec!["b_books"]);
    }

    #[test]
    fn add_books_batches_and_skips_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        let store = CollectionStore::new(&conn);
        store.create_collection("book_info", false).unwrap();

        let books = vec![
            book("0", "Dune", 2019, "Fiction"),
            book("1", "Sapiens", 2015, "Non Fiction"),
            book("0", "Dune again", 2019, "Fiction"),
            book("3", "Educated", 2018, "Non Fiction"),
            book("4", "Becoming", 2009, "Non Fiction"),
        ];
        let summary = store.add_books("book_info", &books, 2).unwrap();
        assert_eq!(summary, ImportSummary { inserted: 4, skipped: 1, batches: 3 });
        assert_eq!(store.count("book_info").unwrap(), 4);
    }

    #[test]
    fn missing_collection_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let store = CollectionStore::new(&conn);
        assert!(matches!(store.count("nope"), Err(BsError::CollectionNotFound(_))));
        assert!(matches!(
            store.add_books("nope", &[], 10),
            Err(BsError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn filter_without_generated_column_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let store = store_with_books(&conn);
        let err = store
            .filter("book_info", &FieldSpec::for_book_field("year"), FilterOp::Gt, "2015", 10)
            .unwrap_err();
        assert!(matches!(err, BsError::FieldNotIndexed { ref field, .. } if field == "year"));
    }

    #[test]
    fn filter_value_encoding_follows_mode() {
        let genre = FieldSpec::for_book_field("genre");
        assert_eq!(
            parse_filter_value(&genre, "Fiction").unwrap(),
            SqlValue::Text("\"Fiction\"".into())
        );
        assert_eq!(
            parse_filter_value(&genre, "\"Fiction\"").unwrap(),
            SqlValue::Text("\"Fiction\"".into())
        );
        let year = FieldSpec::for_book_field("year");
        assert_eq!(parse_filter_value(&year, "2015").unwrap(), SqlValue::Integer(2015));
        assert!(matches!(
            parse_filter_value(&year, "recent"),
            Err(BsError::InvalidFilter(_))
        ));
        let rating = FieldSpec::for_book_field("user_rating");
        assert_eq!(parse_filter_value(&rating, "4.5").unwrap(), SqlValue::Real(4.5));
    }

    #[test]
    fn filter_op_parses_names_and_symbols() {
        assert_eq!("gt".parse::<FilterOp>().unwrap(), FilterOp::Gt);
        assert_eq!(">=".parse::<FilterOp>().unwrap(), FilterOp::Ge);
        assert_eq!("<>".parse::<FilterOp>().unwrap(), FilterOp::Ne);
        assert_eq!("EQ".parse::<FilterOp>().unwrap(), FilterOp::Eq);
        assert!("like".parse::<FilterOp>().is_err());
    }
}
