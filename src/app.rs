//! Per-invocation application context.

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::schema::naming;
use crate::storage::Database;

/// Resolved settings shared by every command.
///
/// The database is opened on demand so that commands which only render
/// DDL never create a database file.
#[derive(Debug)]
pub struct AppContext {
    /// Directory the project config and relative database paths resolve against.
    pub root: PathBuf,
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub db_path: PathBuf,
    pub collection: String,
    pub robot_mode: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &root)?;

        let db_path = cli
            .database
            .clone()
            .unwrap_or_else(|| config.database_path(&root));
        let collection = cli
            .collection
            .clone()
            .unwrap_or_else(|| config.collection.name.clone());
        naming::validate_collection_name(&collection)?;

        Ok(Self {
            root,
            config_path: cli.config.clone(),
            config,
            db_path,
            collection,
            robot_mode: cli.robot,
            verbosity: cli.verbose,
        })
    }

    pub fn open_db(&self) -> Result<Database> {
        tracing::debug!(path = %self.db_path.display(), "opening database");
        Database::open(&self.db_path)
    }
}
