//! Generated-column indexing of collection metadata.
//!
//! - [`naming`]: table, column and index names derived from field names
//! - [`field`]: field specs and the bindings derived from them
//! - [`engine`]: the live-schema seam ([`SchemaEngine`])
//! - [`sqlite`]: the rusqlite-backed engine
//! - [`dialect`]: DDL rendering for SeekDB and SQLite
//! - [`sync`]: the synchronizer itself

pub mod dialect;
pub mod engine;
pub mod field;
pub mod naming;
pub mod sqlite;
pub mod sync;

pub use dialect::{Dialect, DialectKind, SeekDbDialect, SqliteDialect, plan_changes, render_script};
pub use engine::{ColumnInfo, EngineError, EngineErrorKind, IndexInfo, SchemaChange, SchemaEngine};
pub use field::{DEFAULT_INDEX_FIELDS, ExtractionMode, FieldSpec, SqlType};
pub use sqlite::SqliteEngine;
pub use sync::{
    BatchSummary, FieldReport, FieldState, IndexOutcome, IndexSynchronizer, RemovalOutcome,
};
