pub mod app;
pub mod books;
pub mod cli;
pub mod config;
pub mod error;
pub mod schema;
pub mod storage;
pub mod test_utils;

pub use error::{BsError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
