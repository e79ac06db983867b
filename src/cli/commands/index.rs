//! bookseek index - Manage generated columns and metadata indexes

use std::collections::BTreeMap;

use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::{outcome_line, resolve_specs};
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok, robot_partial};
use crate::error::{BsError, Result};
use crate::schema::dialect::{DialectKind, render_script};
use crate::schema::sync::{BatchSummary, FieldReport, FieldState, IndexOutcome, RemovalOutcome};

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommand,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Create missing generated columns and indexes (configured fields by default)
    Ensure(FieldsArgs),

    /// Drop the index, then the generated column, of each field
    Remove(RequiredFieldsArgs),

    /// Drop and recreate fields, e.g. after changing their type
    Rebuild(RequiredFieldsArgs),

    /// List fully indexed fields
    List,

    /// Show the state of configured and live fields
    Status,

    /// Print the DDL for the fields without touching the database
    Script(ScriptArgs),
}

#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Metadata fields (default: index.fields from config)
    pub fields: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RequiredFieldsArgs {
    /// Metadata fields
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ScriptArgs {
    /// SQL dialect to render
    #[arg(long, value_enum, default_value_t)]
    pub dialect: DialectKind,

    /// Render the teardown script instead
    #[arg(long)]
    pub drop: bool,

    /// Metadata fields (default: index.fields from config)
    pub fields: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct BatchOutput<'a> {
    pub collection: &'a str,
    pub fields: &'a [FieldReport],
    pub summary: BatchSummary,
}

#[derive(Serialize)]
struct RemovalReport {
    field: String,
    outcome: RemovalOutcome,
}

#[derive(Serialize)]
struct FieldStatus {
    field: String,
    state: FieldState,
    configured: bool,
}

pub fn run(ctx: &AppContext, args: &IndexArgs) -> Result<()> {
    match &args.command {
        IndexCommand::Ensure(args) => run_ensure(ctx, args),
        IndexCommand::Remove(args) => run_remove(ctx, args),
        IndexCommand::Rebuild(args) => run_rebuild(ctx, args),
        IndexCommand::List => run_list(ctx),
        IndexCommand::Status => run_status(ctx),
        IndexCommand::Script(args) => run_script(ctx, args),
    }
}

fn run_ensure(ctx: &AppContext, args: &FieldsArgs) -> Result<()> {
    let specs = resolve_specs(ctx, &args.fields);
    let db = ctx.open_db()?;
    let reports = db.synchronizer().ensure_all_indexed(&ctx.collection, &specs)?;
    report_batch(ctx, &reports)
}

fn run_rebuild(ctx: &AppContext, args: &RequiredFieldsArgs) -> Result<()> {
    let specs = resolve_specs(ctx, &args.fields);
    let db = ctx.open_db()?;
    let sync = db.synchronizer();
    let mut reports = Vec::with_capacity(specs.len());
    for spec in &specs {
        let outcome = match sync.rebuild_field_index(&ctx.collection, spec) {
            Ok(outcome) => outcome,
            Err(err @ BsError::CollectionNotFound(_)) => return Err(err),
            Err(err) => IndexOutcome::Failed(err.to_string()),
        };
        reports.push(FieldReport {
            field: spec.field_name.clone(),
            outcome,
        });
    }
    report_batch(ctx, &reports)
}

/// Print a per-field report and fail with `PartialFailure` if any field failed.
pub(crate) fn report_batch(ctx: &AppContext, reports: &[FieldReport]) -> Result<()> {
    let summary = BatchSummary::from_reports(reports);
    let output = BatchOutput {
        collection: &ctx.collection,
        fields: reports,
        summary,
    };

    if ctx.robot_mode {
        if summary.failed > 0 {
            emit_robot(&robot_partial(
                summary.created + summary.already_exists,
                summary.failed,
                &output,
            ))?;
        } else {
            emit_robot(&robot_ok(&output))?;
        }
    } else {
        for report in reports {
            println!("{}", outcome_line(&report.field, &report.outcome));
        }
        println!(
            "{} created, {} already indexed, {} failed",
            summary.created, summary.already_exists, summary.failed
        );
    }

    if summary.failed > 0 {
        return Err(BsError::PartialFailure {
            failed: summary.failed,
            total: summary.total(),
        });
    }
    Ok(())
}

fn run_remove(ctx: &AppContext, args: &RequiredFieldsArgs) -> Result<()> {
    let db = ctx.open_db()?;
    let sync = db.synchronizer();
    let mut reports = Vec::with_capacity(args.fields.len());
    for field in &args.fields {
        let outcome = sync.remove_field_index(&ctx.collection, field)?;
        reports.push(RemovalReport {
            field: field.clone(),
            outcome,
        });
    }

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "collection": ctx.collection,
            "fields": reports,
        })));
    }
    for report in &reports {
        match report.outcome {
            RemovalOutcome::Removed => println!("{} {} removed", "✓".green(), report.field),
            RemovalOutcome::AlreadyAbsent => {
                println!("{} {} was not indexed", "•".dimmed(), report.field);
            }
        }
    }
    Ok(())
}

fn run_list(ctx: &AppContext) -> Result<()> {
    let db = ctx.open_db()?;
    let fields = db.synchronizer().list_indexed_fields(&ctx.collection)?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "collection": ctx.collection,
            "fields": fields,
        })));
    }
    if fields.is_empty() {
        println!("No indexed fields on {}", ctx.collection.bold());
    } else {
        for field in &fields {
            println!("{field}");
        }
    }
    Ok(())
}

fn run_status(ctx: &AppContext) -> Result<()> {
    let db = ctx.open_db()?;
    let live = db.synchronizer().field_states(&ctx.collection)?;

    let mut states: BTreeMap<String, FieldStatus> = BTreeMap::new();
    for spec in ctx.config.index_specs() {
        let state = live
            .get(&spec.field_name)
            .copied()
            .unwrap_or(FieldState::Unconfigured);
        states.insert(
            spec.field_name.clone(),
            FieldStatus {
                field: spec.field_name,
                state,
                configured: true,
            },
        );
    }
    for (field, state) in live {
        states.entry(field.clone()).or_insert(FieldStatus {
            field,
            state,
            configured: false,
        });
    }
    let statuses: Vec<FieldStatus> = states.into_values().collect();

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "collection": ctx.collection,
            "fields": statuses,
        })));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Metadata indexes on {}", ctx.collection));
    for status in &statuses {
        let state = match status.state {
            FieldState::Indexed => "indexed".green().to_string(),
            FieldState::ColumnOnly => "column only".yellow().to_string(),
            FieldState::Unconfigured => "not indexed".dimmed().to_string(),
        };
        let note = if status.configured { "" } else { " (not configured)" };
        layout.kv(&status.field, &format!("{state}{note}"));
    }
    emit_human(layout);
    Ok(())
}

fn run_script(ctx: &AppContext, args: &ScriptArgs) -> Result<()> {
    let specs = resolve_specs(ctx, &args.fields);
    let script = render_script(args.dialect.dialect(), &ctx.collection, &specs, args.drop)?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "collection": ctx.collection,
            "dialect": args.dialect,
            "drop": args.drop,
            "script": script,
        })));
    }
    print!("{script}");
    Ok(())
}
