//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use colored::Colorize;

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;
use crate::schema::field::FieldSpec;
use crate::schema::sync::IndexOutcome;

pub mod collection;
pub mod filter;
pub mod index;
pub mod load;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Index(args) => index::run(ctx, args),
        Commands::Collection(args) => collection::run(ctx, args),
        Commands::Load(args) => load::run(ctx, args),
        Commands::Filter(args) => filter::run(ctx, args),
    }
}

/// Specs for the named fields, or the configured set when none are named.
pub(crate) fn resolve_specs(ctx: &AppContext, fields: &[String]) -> Vec<FieldSpec> {
    if fields.is_empty() {
        ctx.config.index_specs()
    } else {
        fields.iter().map(|field| ctx.config.spec_for(field)).collect()
    }
}

pub(crate) fn outcome_line(field: &str, outcome: &IndexOutcome) -> String {
    match outcome {
        IndexOutcome::Created => format!("{} {field} created", "✓".green()),
        IndexOutcome::AlreadyExists => format!("{} {field} already indexed", "•".dimmed()),
        IndexOutcome::Failed(reason) => format!("{} {field} failed: {reason}", "✗".red()),
    }
}
