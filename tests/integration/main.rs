//! Integration tests running the synchronizer and collection store against
//! an on-disk SQLite database.

mod collection_tests;
mod filter_tests;
mod fixture;
mod sync_tests;
