//! bookseek load - Import books from a JSON-lines or CSV file

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::books::read_books;
use crate::cli::commands::index::report_batch;
use crate::cli::output::{emit_robot, robot_ok, robot_partial};
use crate::error::{BsError, Result};
use crate::schema::sync::{BatchSummary, FieldReport};
use crate::storage::ImportSummary;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Book dump: `.csv` with a header row, otherwise JSON lines
    pub path: PathBuf,

    /// Rows per insert transaction (default: collection.batch_size)
    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Ensure the configured metadata indexes after importing
    #[arg(long)]
    pub index: bool,
}

#[derive(Serialize)]
struct LoadOutput<'a> {
    collection: &'a str,
    file: String,
    records: usize,
    validation_errors: usize,
    import: ImportSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<IndexSection<'a>>,
}

#[derive(Serialize)]
struct IndexSection<'a> {
    fields: &'a [FieldReport],
    summary: BatchSummary,
}

pub fn run(ctx: &AppContext, args: &LoadArgs) -> Result<()> {
    let batch_size = args.batch_size.unwrap_or(ctx.config.collection.batch_size);
    if batch_size == 0 {
        return Err(BsError::Config("--batch-size must be at least 1".to_string()));
    }

    let loaded = read_books(&args.path)?;
    let db = ctx.open_db()?;
    let store = db.collections();
    store.create_collection(&ctx.collection, false)?;
    let import = store.add_books(&ctx.collection, &loaded.records, batch_size)?;

    let reports = if args.index {
        Some(
            db.synchronizer()
                .ensure_all_indexed(&ctx.collection, &ctx.config.index_specs())?,
        )
    } else {
        None
    };

    if ctx.robot_mode {
        let index = reports.as_deref().map(|fields| IndexSection {
            fields,
            summary: BatchSummary::from_reports(fields),
        });
        let failed = index.as_ref().map_or(0, |section| section.summary.failed);
        let output = LoadOutput {
            collection: &ctx.collection,
            file: args.path.display().to_string(),
            records: loaded.records.len(),
            validation_errors: loaded.validation_errors,
            import,
            index,
        };
        if failed > 0 {
            let total = reports.as_ref().map_or(0, Vec::len);
            emit_robot(&robot_partial(total - failed, failed, &output))?;
            return Err(BsError::PartialFailure { failed, total });
        }
        return emit_robot(&robot_ok(&output));
    }

    println!(
        "{} Imported {} of {} books into {} ({} batches)",
        "✓".green(),
        import.inserted,
        loaded.records.len(),
        ctx.collection.bold(),
        import.batches
    );
    if import.skipped > 0 {
        println!("{} {} records skipped", "!".yellow(), import.skipped);
    }
    if loaded.validation_errors > 0 {
        println!(
            "{} {} records failed validation and were stored with default metadata",
            "!".yellow(),
            loaded.validation_errors
        );
    }
    match reports {
        Some(reports) => report_batch(ctx, &reports),
        None => Ok(()),
    }
}
