//! Pulls a SQL statement out of free-form model output.

use std::sync::LazyLock;

use regex::Regex;

/// First fenced block, non-greedy across lines, with an optional SQL language tag.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:(?i:sql|mysql|postgresql|postgres|sqlite)\b)?(.*?)```")
        .expect("fenced block pattern is valid")
});

/// The trimmed body of the first fenced block, or the whole text trimmed.
///
/// Never fails and does not parse SQL.
pub fn extract_sql(raw: &str) -> String {
    FENCED_BLOCK
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}
