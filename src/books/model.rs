//! Book records as stored in a collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::books::text::{json_safe_text, sanitize_text, truncate_chars};
use crate::error::{BsError, Result};

pub const MAX_NAME_CHARS: usize = 500;
pub const MAX_AUTHOR_CHARS: usize = 200;
pub const MIN_YEAR: i64 = 1900;
pub const MAX_YEAR: i64 = 2100;
pub const MAX_RATING: f64 = 5.0;

const UNKNOWN: &str = "Unknown";
const FALLBACK_YEAR: i64 = 2000;

/// A book as it appears in an input file, before cleaning.
///
/// Accepts the Kaggle bestsellers header names as well as snake_case keys.
/// Values are kept loose: numbers may arrive as strings and vice versa.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBook {
    #[serde(default, alias = "Name")]
    pub name: Option<Value>,
    #[serde(default, alias = "Author")]
    pub author: Option<Value>,
    #[serde(default, alias = "User Rating")]
    pub user_rating: Option<Value>,
    #[serde(default, alias = "Reviews")]
    pub reviews: Option<Value>,
    #[serde(default, alias = "Price")]
    pub price: Option<Value>,
    #[serde(default, alias = "Year")]
    pub year: Option<Value>,
    #[serde(default, alias = "Genre")]
    pub genre: Option<Value>,
}

/// Cleaned and validated book metadata, the JSON stored in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub name: String,
    pub author: String,
    pub user_rating: f64,
    pub reviews: i64,
    pub price: f64,
    pub year: i64,
    pub genre: String,
}

impl BookMetadata {
    /// Clean text fields, zero non-finite numbers, and reject values outside
    /// their ranges.
    pub fn new(
        name: &str,
        author: &str,
        user_rating: f64,
        reviews: i64,
        price: f64,
        year: i64,
        genre: &str,
    ) -> Result<Self> {
        let user_rating = finite_or_zero(user_rating);
        if !(0.0..=MAX_RATING).contains(&user_rating) {
            return Err(BsError::InvalidBook(format!(
                "user_rating must be between 0.0 and {MAX_RATING}, got {user_rating}"
            )));
        }
        let price = finite_or_zero(price);
        if price < 0.0 {
            return Err(BsError::InvalidBook(format!("price must be >= 0.0, got {price}")));
        }
        if reviews < 0 {
            return Err(BsError::InvalidBook(format!("reviews must be >= 0, got {reviews}")));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(BsError::InvalidBook(format!(
                "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
            )));
        }

        Ok(Self {
            name: truncate_chars(&json_safe_text(name), MAX_NAME_CHARS),
            author: truncate_chars(&json_safe_text(author), MAX_AUTHOR_CHARS),
            user_rating,
            reviews,
            price,
            year,
            genre: json_safe_text(genre),
        })
    }

    pub fn from_raw(raw: &RawBook) -> Result<Self> {
        Self::new(
            &text_value(raw.name.as_ref()),
            &text_value(raw.author.as_ref()),
            float_value(raw.user_rating.as_ref()),
            int_value(raw.reviews.as_ref()),
            float_value(raw.price.as_ref()),
            int_value(raw.year.as_ref()),
            &text_value(raw.genre.as_ref()),
        )
    }

    /// Safe stand-in for a record that failed validation: text is kept when
    /// present, numbers are reset.
    #[must_use]
    pub fn fallback(raw: &RawBook) -> Self {
        let text_or_unknown = |value: Option<&Value>, max: Option<usize>| {
            let cleaned = json_safe_text(&text_value(value));
            let cleaned = match max {
                Some(max) => truncate_chars(&cleaned, max),
                None => cleaned,
            };
            if cleaned.is_empty() {
                UNKNOWN.to_string()
            } else {
                cleaned
            }
        };
        Self {
            name: text_or_unknown(raw.name.as_ref(), Some(MAX_NAME_CHARS)),
            author: text_or_unknown(raw.author.as_ref(), Some(MAX_AUTHOR_CHARS)),
            user_rating: 0.0,
            reviews: 0,
            price: 0.0,
            year: FALLBACK_YEAR,
            genre: text_or_unknown(raw.genre.as_ref(), None),
        }
    }
}

/// One row of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRecord {
    pub id: String,
    /// Text the embedding is computed from: `"<name> <author>"`.
    pub document: String,
    pub metadata: BookMetadata,
}

impl BookRecord {
    /// Build the record for the `index`-th input row. The flag is `false`
    /// when validation failed and the metadata is the fallback.
    #[must_use]
    pub fn from_raw(index: usize, raw: &RawBook) -> (Self, bool) {
        let name = sanitize_text(&text_value(raw.name.as_ref()));
        let author = sanitize_text(&text_value(raw.author.as_ref()));
        let document = format!("{name} {author}").trim().to_string();

        let (metadata, valid) = match BookMetadata::from_raw(raw) {
            Ok(metadata) => (metadata, true),
            Err(err) => {
                tracing::debug!(index, error = %err, "book failed validation, using fallback");
                (BookMetadata::fallback(raw), false)
            }
        };

        (
            Self {
                id: index.to_string(),
                document,
                metadata,
            },
            valid,
        )
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn text_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn float_value(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map_or(0.0, finite_or_zero)
}

#[allow(clippy::cast_possible_truncation)]
fn int_value(value: Option<&Value>) -> i64 {
    let from_float = |f: f64| if f.is_finite() { f.trunc() as i64 } else { 0 };
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().map_or(0, from_float)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(from_float))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawBook {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn valid_book_is_cleaned() {
        let book = BookMetadata::new("  Dune  ", "Frank \t Herbert", 4.7, 9000, 9.0, 2019, "Fiction").unwrap();
        assert_eq!(book.name, "Dune");
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.year, 2019);
    }

    #[test]
    fn ranges_are_enforced() {
        assert!(BookMetadata::new("a", "b", 5.1, 0, 0.0, 2000, "g").is_err());
        assert!(BookMetadata::new("a", "b", -0.1, 0, 0.0, 2000, "g").is_err());
        assert!(BookMetadata::new("a", "b", 4.0, -1, 0.0, 2000, "g").is_err());
        assert!(BookMetadata::new("a", "b", 4.0, 0, -1.0, 2000, "g").is_err());
        assert!(BookMetadata::new("a", "b", 4.0, 0, 0.0, 1899, "g").is_err());
        assert!(BookMetadata::new("a", "b", 4.0, 0, 0.0, 2101, "g").is_err());
        assert!(BookMetadata::new("a", "b", 5.0, 0, 0.0, 2100, "g").is_ok());
        assert!(BookMetadata::new("a", "b", 0.0, 0, 0.0, 1900, "g").is_ok());
    }

    #[test]
    fn non_finite_numbers_become_zero() {
        let book = BookMetadata::new("a", "b", f64::NAN, 0, f64::INFINITY, 2000, "g").unwrap();
        assert_eq!(book.user_rating, 0.0);
        assert_eq!(book.price, 0.0);
    }

    #[test]
    fn long_text_is_truncated() {
        let name = "x".repeat(600);
        let author = "y".repeat(250);
        let book = BookMetadata::new(&name, &author, 4.0, 0, 0.0, 2000, "g").unwrap();
        assert_eq!(book.name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(book.author.chars().count(), MAX_AUTHOR_CHARS);
    }

    #[test]
    fn raw_accepts_kaggle_headers_and_loose_numbers() {
        let raw = raw(json!({
            "Name": "Sapiens", "Author": "Yuval Noah Harari", "User Rating": "4.7",
            "Reviews": 30000, "Price": "17", "Year": 2015.0, "Genre": "Non Fiction"
        }));
        let book = BookMetadata::from_raw(&raw).unwrap();
        assert_eq!(book.user_rating, 4.7);
        assert_eq!(book.price, 17.0);
        assert_eq!(book.year, 2015);
        assert_eq!(book.genre, "Non Fiction");
    }

    #[test]
    fn raw_accepts_snake_case_keys() {
        let raw = raw(json!({"name": "Dune", "author": "Frank Herbert", "user_rating": 4.5, "reviews": 1, "price": 1, "year": 1965, "genre": "Fiction"}));
        assert_eq!(BookMetadata::from_raw(&raw).unwrap().year, 1965);
    }

    #[test]
    fn invalid_record_falls_back() {
        let raw = raw(json!({"Name": "Old Book", "Author": "", "User Rating": 4.0, "Year": 1850}));
        let (record, valid) = BookRecord::from_raw(7, &raw);
        assert!(!valid);
        assert_eq!(record.id, "7");
        assert_eq!(record.document, "Old Book");
        assert_eq!(record.metadata.name, "Old Book");
        assert_eq!(record.metadata.author, "Unknown");
        assert_eq!(record.metadata.genre, "Unknown");
        assert_eq!(record.metadata.year, 2000);
        assert_eq!(record.metadata.user_rating, 0.0);
    }

    #[test]
    fn document_joins_name_and_author() {
        let raw = raw(json!({"Name": "Dune", "Author": "Frank Herbert", "User Rating": 4.7, "Reviews": 1, "Price": 1, "Year": 2019, "Genre": "Fiction"}));
        let (record, valid) = BookRecord::from_raw(0, &raw);
        assert!(valid);
        assert_eq!(record.document, "Dune Frank Herbert");
    }

    #[test]
    fn metadata_serializes_with_snake_case_keys() {
        let book = BookMetadata::new("Dune", "Frank Herbert", 4.7, 9000, 9.0, 2019, "Fiction").unwrap();
        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value["user_rating"], json!(4.7));
        assert_eq!(value["year"], json!(2019));
    }
}
