//! Metadata field definitions and the schema bindings derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BsError, Result};
use crate::schema::naming;

/// Fields indexed when neither the config nor the command line names any.
pub const DEFAULT_INDEX_FIELDS: [&str; 4] = ["genre", "year", "user_rating", "author"];

/// Column type of a generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SqlType {
    Varchar(u16),
    Int,
    BigInt,
    Float,
    Double,
}

impl SqlType {
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, Self::Varchar(_))
    }

    /// Extraction mode used when a field does not declare one.
    #[must_use]
    pub const fn default_mode(&self) -> ExtractionMode {
        if self.is_numeric() {
            ExtractionMode::AsScalar
        } else {
            ExtractionMode::AsJson
        }
    }

    /// Compare against a type string reported by the engine.
    #[must_use]
    pub fn matches_declared(&self, declared: &str) -> bool {
        let normalized: String = declared
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        match self {
            Self::Int => matches!(normalized.as_str(), "INT" | "INTEGER"),
            other => normalized == other.to_string(),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varchar(len) => write!(f, "VARCHAR({len})"),
            Self::Int => f.write_str("INT"),
            Self::BigInt => f.write_str("BIGINT"),
            Self::Float => f.write_str("FLOAT"),
            Self::Double => f.write_str("DOUBLE"),
        }
    }
}

impl FromStr for SqlType {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "INT" | "INTEGER" => return Ok(Self::Int),
            "BIGINT" => return Ok(Self::BigInt),
            "FLOAT" => return Ok(Self::Float),
            "DOUBLE" => return Ok(Self::Double),
            _ => {}
        }
        let len = upper
            .strip_prefix("VARCHAR(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("unsupported SQL type '{raw}'"))?;
        match len.trim().parse::<u16>() {
            Ok(n) if n > 0 => Ok(Self::Varchar(n)),
            _ => Err(format!("invalid VARCHAR length in '{raw}'")),
        }
    }
}

impl TryFrom<String> for SqlType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SqlType> for String {
    fn from(value: SqlType) -> Self {
        value.to_string()
    }
}

/// How a generated column reads its value out of the metadata document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// `->`: keeps the JSON representation, so strings stay quoted and
    /// compare as text.
    AsJson,
    /// `->>`: unwraps to a SQL scalar coerced to the declared numeric type.
    AsScalar,
}

impl ExtractionMode {
    /// JSON path operator used in the generated column expression.
    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::AsJson => "->",
            Self::AsScalar => "->>",
        }
    }
}

/// A metadata field that should be backed by a generated column and index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field_name: String,
    pub sql_type: SqlType,
    /// Defaults to `$.<field_name>`.
    #[serde(default)]
    pub json_path: Option<String>,
    /// Defaults to the type's natural mode.
    #[serde(default)]
    pub extraction_mode: Option<ExtractionMode>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        sql_type: SqlType,
        json_path: impl Into<String>,
        extraction_mode: ExtractionMode,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            sql_type,
            json_path: Some(json_path.into()),
            extraction_mode: Some(extraction_mode),
        }
    }

    /// Spec for a field of the book dataset, using the dataset's type table.
    /// Unknown fields are treated as `VARCHAR(255)` strings.
    #[must_use]
    pub fn for_book_field(field_name: &str) -> Self {
        let sql_type = match field_name {
            "genre" => SqlType::Varchar(100),
            "author" => SqlType::Varchar(200),
            "name" => SqlType::Varchar(500),
            "year" | "reviews" => SqlType::Int,
            "user_rating" | "price" => SqlType::Float,
            _ => SqlType::Varchar(255),
        };
        Self {
            field_name: field_name.to_string(),
            sql_type,
            json_path: None,
            extraction_mode: None,
        }
    }

    #[must_use]
    pub fn json_path(&self) -> String {
        self.json_path
            .clone()
            .unwrap_or_else(|| format!("$.{}", self.field_name))
    }

    #[must_use]
    pub fn mode(&self) -> ExtractionMode {
        self.extraction_mode
            .unwrap_or_else(|| self.sql_type.default_mode())
    }

    pub fn validate(&self) -> Result<()> {
        naming::validate_field_name(&self.field_name)?;
        validate_json_path(&self.json_path()).map_err(|reason| BsError::InvalidField {
            field: self.field_name.clone(),
            reason,
        })
    }

    #[must_use]
    pub fn column_binding(&self, collection: &str) -> GeneratedColumnBinding {
        GeneratedColumnBinding {
            table: naming::table_name(collection),
            column: naming::generated_column_name(&self.field_name),
            sql_type: self.sql_type,
            json_path: self.json_path(),
            mode: self.mode(),
        }
    }

    #[must_use]
    pub fn index_binding(&self, collection: &str) -> IndexBinding {
        IndexBinding {
            table: naming::table_name(collection),
            index: naming::index_name(&self.field_name),
            column: naming::generated_column_name(&self.field_name),
        }
    }
}

/// Generated column for one field on one collection table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedColumnBinding {
    pub table: String,
    pub column: String,
    pub sql_type: SqlType,
    pub json_path: String,
    pub mode: ExtractionMode,
}

impl GeneratedColumnBinding {
    /// Expression over the `metadata` document, e.g. `metadata->>'$.year'`.
    #[must_use]
    pub fn source_expression(&self) -> String {
        format!("metadata{}'{}'", self.mode.operator(), self.json_path)
    }
}

/// Non-unique index over a generated column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexBinding {
    pub table: String,
    pub index: String,
    pub column: String,
}

/// `$` followed by `.member` or `[n]` steps. Members are identifiers, so the
/// path can be embedded in a single-quoted SQL literal.
pub fn validate_json_path(path: &str) -> std::result::Result<(), String> {
    let rest = path
        .strip_prefix('$')
        .ok_or_else(|| format!("json path '{path}' must start with '$'"))?;
    if rest.is_empty() {
        return Err(format!("json path '{path}' must select a member of the document"));
    }

    let mut remaining = rest;
    while !remaining.is_empty() {
        if let Some(after_dot) = remaining.strip_prefix('.') {
            let end = after_dot
                .find(['.', '['])
                .unwrap_or(after_dot.len());
            let member = &after_dot[..end];
            if !naming::is_identifier(member) {
                return Err(format!("json path '{path}' has invalid member '{member}'"));
            }
            remaining = &after_dot[end..];
        } else if let Some(after_bracket) = remaining.strip_prefix('[') {
            let end = after_bracket
                .find(']')
                .ok_or_else(|| format!("json path '{path}' has an unclosed '['"))?;
            let index = &after_bracket[..end];
            if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!("json path '{path}' has invalid array index '{index}'"));
            }
            remaining = &after_bracket[end + 1..];
        } else {
            return Err(format!("json path '{path}' has unexpected text '{remaining}'"));
        }
    }
    Ok(())
}
