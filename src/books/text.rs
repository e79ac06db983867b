//! Text cleanup for book fields.

use std::sync::LazyLock;

use regex::Regex;

/// C0 controls except `\t`, `\n`, `\r`, plus DEL and the C1 block.
static CONTROL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f-\x9f]").unwrap()
});

static ALL_CONTROL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x1f\x7f-\x9f]").unwrap()
});

static SPACE_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

static BLANK_LINES_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Strip control characters, fold runs of spaces and tabs, collapse blank
/// lines and trim.
pub fn sanitize_text(text: &str) -> String {
    let text = CONTROL_REGEX.replace_all(text, "");
    let text = SPACE_RUN_REGEX.replace_all(&text, " ");
    let text = BLANK_LINES_REGEX.replace_all(&text, "\n");
    text.trim().to_string()
}

/// [`sanitize_text`], then drop the remaining control characters and turn
/// double quotes (straight or curly) into single quotes.
pub fn json_safe_text(text: &str) -> String {
    let cleaned = sanitize_text(text);
    ALL_CONTROL_REGEX
        .replace_all(&cleaned, "")
        .replace(['"', '\u{201c}', '\u{201d}'], "'")
}

/// Keep at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
