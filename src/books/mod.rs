//! Book dataset model: cleaning, validation and loading.

pub mod loader;
pub mod model;
pub mod text;

pub use loader::{LoadedBooks, parse_csv, parse_jsonl, read_books, read_csv, read_jsonl};
pub use model::{BookMetadata, BookRecord, RawBook};
pub use text::{json_safe_text, sanitize_text};
