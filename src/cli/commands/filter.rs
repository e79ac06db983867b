//! bookseek filter - Query a collection through a metadata index

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;
use crate::storage::FilterOp;

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Metadata field with a generated column, e.g. year
    pub field: String,

    /// Comparison: eq, ne, gt, ge, lt, le (or =, !=, >, >=, <, <=)
    pub op: FilterOp,

    /// Value to compare against
    #[arg(allow_hyphen_values = true)]
    pub value: String,

    /// Maximum number of books to show
    #[arg(long, short = 'n', default_value = "10")]
    pub limit: usize,
}

pub fn run(ctx: &AppContext, args: &FilterArgs) -> Result<()> {
    let spec = ctx.config.spec_for(&args.field);
    let db = ctx.open_db()?;
    let books = db
        .collections()
        .filter(&ctx.collection, &spec, args.op, &args.value, args.limit)?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "collection": ctx.collection,
            "field": args.field,
            "op": args.op,
            "value": args.value,
            "count": books.len(),
            "books": books,
        })));
    }

    if books.is_empty() {
        println!("No books match {} {} {}", args.field, args.op, args.value);
        return Ok(());
    }
    for book in &books {
        let value = book
            .metadata
            .get(&args.field)
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("{:>5}  {}  {}", book.id.dimmed(), book.document, format!("[{}={value}]", args.field).cyan());
    }
    Ok(())
}
