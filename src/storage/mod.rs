//! Storage layer for bookseek
//!
//! A single SQLite database holds every collection as a `c$v1$<name>` table.

pub mod collection;
pub mod sqlite;

pub use collection::{CollectionStore, FilterOp, ImportSummary, StoredBook};
pub use sqlite::Database;
