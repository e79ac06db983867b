//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module when the error
//! carries enough context to name the exact command to run.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::CollectionNotFound => suggest_collection_not_found(context),
        ErrorCode::FieldNotIndexed => suggest_field_not_indexed(context),
        ErrorCode::IndexPartialFailure => suggest_partial_failure(context),
        _ => code.suggestion().to_string(),
    }
}

fn context_str<'a>(context: Option<&'a Value>, key: &str) -> Option<&'a str> {
    context.and_then(|c| c.get(key)).and_then(Value::as_str)
}

fn suggest_collection_not_found(context: Option<&Value>) -> String {
    match context_str(context, "collection") {
        Some(name) => format!(
            "Collection '{name}' does not exist. Try:\n  - `bookseek --collection {name} collection create`\n  - `bookseek collection list` to see existing collections"
        ),
        None => ErrorCode::CollectionNotFound.suggestion().to_string(),
    }
}

fn suggest_field_not_indexed(context: Option<&Value>) -> String {
    match context_str(context, "field") {
        Some(field) => format!("Run `bookseek index ensure {field}` to create its generated column and index"),
        None => ErrorCode::FieldNotIndexed.suggestion().to_string(),
    }
}

fn suggest_partial_failure(context: Option<&Value>) -> String {
    let failed = context.and_then(|c| c.get("failed")).and_then(Value::as_u64);
    match failed {
        Some(1) => "One field failed. Re-run `bookseek index ensure`; completed fields are skipped".to_string(),
        Some(n) => format!("{n} fields failed. Re-run `bookseek index ensure`; completed fields are skipped"),
        None => ErrorCode::IndexPartialFailure.suggestion().to_string(),
    }
}
