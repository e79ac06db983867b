use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

use crate::error::{BsError, ErrorCode, Result, StructuredError};

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    /// Rich error with structured information
    #[serde(rename = "error")]
    StructuredError {
        /// Error code enum value (e.g., "COLLECTION_NOT_FOUND")
        code: ErrorCode,
        /// Numeric error code (e.g., 101)
        numeric_code: u16,
        message: String,
        /// Actionable suggestion for recovery
        suggestion: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
        recoverable: bool,
        /// Error category (e.g., "collection", "index")
        category: String,
    },
    /// Some items of a batch failed; `data` carries the per-item report.
    Partial { completed: usize, failed: usize },
}

fn response<T>(status: RobotStatus, data: T) -> RobotResponse<T> {
    RobotResponse {
        status,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    response(RobotStatus::Ok, data)
}

pub fn robot_partial<T: Serialize>(completed: usize, failed: usize, data: T) -> RobotResponse<T> {
    response(RobotStatus::Partial { completed, failed }, data)
}

/// Create a robot error response from a `BsError` with structured information.
pub fn robot_error_structured(err: &BsError) -> RobotResponse<serde_json::Value> {
    response(RobotStatus::from(err.to_structured()), serde_json::Value::Null)
}

impl From<StructuredError> for RobotStatus {
    fn from(err: StructuredError) -> Self {
        Self::StructuredError {
            code: err.code,
            numeric_code: err.numeric_code,
            message: err.message,
            suggestion: err.suggestion,
            context: err.context,
            recoverable: err.recoverable,
            category: err.category,
        }
    }
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>) -> Result<()> {
    emit_json(response)
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 14,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        self.lines
            .push(format!("{key:width$} {value}", width = self.key_width));
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_error_structured_includes_all_fields() {
        let err = BsError::CollectionNotFound("book_info".into());
        let response = robot_error_structured(&err);

        match response.status {
            RobotStatus::StructuredError {
                code,
                numeric_code,
                message,
                suggestion,
                recoverable,
                category,
                ..
            } => {
                assert_eq!(code, ErrorCode::CollectionNotFound);
                assert_eq!(numeric_code, 101);
                assert!(message.contains("book_info"));
                assert!(suggestion.contains("collection create"));
                assert!(recoverable);
                assert_eq!(category, "collection");
            }
            _ => panic!("Expected StructuredError status"),
        }
    }

    #[test]
    fn robot_error_structured_serialization() {
        let err = BsError::FieldNotIndexed {
            collection: "book_info".into(),
            field: "year".into(),
        };
        let json = serde_json::to_string(&robot_error_structured(&err)).unwrap();

        assert!(json.contains("\"error\""));
        assert!(json.contains("FIELD_NOT_INDEXED"));
        assert!(json.contains("\"numeric_code\":202"));
        assert!(json.contains("\"category\":\"index\""));
    }

    #[test]
    fn partial_status_serializes_counts() {
        let response = robot_partial(6, 1, serde_json::json!({"fields": []}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"]["partial"]["failed"], 1);
        assert_eq!(value["status"]["partial"]["completed"], 6);
    }

    #[test]
    fn ok_status_serializes_as_string() {
        let value = serde_json::to_value(robot_ok(1)).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"], 1);
    }

    #[test]
    fn human_layout_aligns_keys() {
        let mut layout = HumanLayout::new();
        layout.kv("documents", "5").push_line("done");
        let text = layout.build();
        assert!(text.starts_with("documents      5"));
        assert!(text.ends_with("done"));
    }
}
