//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// bookseek - Metadata indexes for book collections
#[derive(Parser, Debug)]
#[command(name = "bookseek")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON on stdout for machine consumption
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/bookseek/config.toml, then ./bookseek.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides database.path)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Collection to operate on (overrides collection.name)
    #[arg(long, short = 'c', global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage generated columns and metadata indexes
    Index(commands::index::IndexArgs),

    /// Create, delete and inspect collections
    Collection(commands::collection::CollectionArgs),

    /// Import books from a JSON-lines file
    Load(commands::load::LoadArgs),

    /// Query a collection through a metadata index
    Filter(commands::filter::FilterArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bookseek", "index", "list", "--robot", "-vv", "--collection", "bestsellers",
        ])
        .unwrap();
        assert!(cli.robot);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.collection.as_deref(), Some("bestsellers"));
    }
}
