//! bookseek collection - Create, delete and inspect collections

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{BsError, Result};
use crate::schema::naming;
use crate::schema::sync::FieldState;

#[derive(Args, Debug)]
pub struct CollectionArgs {
    #[command(subcommand)]
    pub command: CollectionCommand,
}

#[derive(Subcommand, Debug)]
pub enum CollectionCommand {
    /// Create the collection's table
    Create {
        /// Drop and recreate the collection if it exists
        #[arg(long)]
        recreate: bool,
    },

    /// Drop the collection with its documents and indexes
    Delete,

    /// List collections in the database
    List,

    /// Show document count and index state
    Info,
}

pub fn run(ctx: &AppContext, args: &CollectionArgs) -> Result<()> {
    let db = ctx.open_db()?;
    let store = db.collections();
    let name = ctx.collection.as_str();

    match &args.command {
        CollectionCommand::Create { recreate } => {
            let created = store.create_collection(name, *recreate)?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "collection": name,
                    "created": created,
                })));
            }
            if created {
                println!("{} Created collection {}", "✓".green(), name.bold());
            } else {
                println!("{} Collection {} already exists", "•".dimmed(), name.bold());
            }
        }
        CollectionCommand::Delete => {
            let deleted = store.delete_collection(name)?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "collection": name,
                    "deleted": deleted,
                })));
            }
            if deleted {
                println!("{} Deleted collection {}", "✓".green(), name.bold());
            } else {
                println!("{} Collection {} did not exist", "•".dimmed(), name.bold());
            }
        }
        CollectionCommand::List => {
            let names = store.list_collections()?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({ "collections": names })));
            }
            if names.is_empty() {
                println!("No collections");
            }
            for name in names {
                println!("{name}");
            }
        }
        CollectionCommand::Info => {
            if !store.exists(name)? {
                return Err(BsError::CollectionNotFound(name.to_string()));
            }
            let documents = store.count(name)?;
            let fields = db.synchronizer().field_states(name)?;

            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "collection": name,
                    "table": naming::table_name(name),
                    "documents": documents,
                    "fields": fields,
                })));
            }

            let indexed = fields
                .values()
                .filter(|state| **state == FieldState::Indexed)
                .count();
            let mut layout = HumanLayout::new();
            layout.title(&format!("Collection {name}"));
            layout
                .kv("table", &naming::table_name(name))
                .kv("documents", &documents.to_string())
                .kv("indexed", &format!("{indexed} of {} generated columns", fields.len()));
            emit_human(layout);
        }
    }
    Ok(())
}
