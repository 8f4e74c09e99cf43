//! SQL extraction from raw model output.
//!
//! Models wrap SQL in code fences, inline code, prose, or REPL markers. The
//! extractor strips that decoration and keeps the first `SELECT` statement:
//! from the first `SELECT` keyword up to and including the first semicolon,
//! or to the end of the text when there is none. A statement opened by an
//! inline-code backtick also ends at the closing backtick. No SQL grammar
//! is parsed, so a semicolon inside a string literal also ends the statement.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::NqlError;

/// Case-insensitive `SELECT` keyword on word boundaries.
static SELECT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bselect\b").unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// REPL prompt marker some local models echo back.
const REPL_MARKER: &str = ">>>";

/// Markdown code fence.
const FENCE: &str = "```";

/// A single SQL statement extracted from model output.
///
/// Always starts with `SELECT` (any case) and has no surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CandidateQuery(String);

impl CandidateQuery {
    /// Extracts a candidate from raw model output.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::MalformedOutput`] if there is no `SELECT` keyword.
    pub fn extract(raw: &str) -> Result<Self, NqlError> {
        extract_sql(raw)
    }

    /// The SQL text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the candidate, returning the SQL text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CandidateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CandidateQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the first `SELECT` statement from raw model output.
///
/// # Errors
///
/// Returns [`NqlError::MalformedOutput`] carrying the raw text if no
/// `SELECT` keyword is present.
pub fn extract_sql(raw: &str) -> Result<CandidateQuery, NqlError> {
    let cleaned = strip_decoration(raw);

    let start = SELECT_KEYWORD
        .find(&cleaned)
        .map(|m| m.start())
        .ok_or_else(|| NqlError::MalformedOutput {
            content: raw.to_string(),
        })?;

    let statement = &cleaned[start..];
    let statement = statement
        .find(';')
        .map_or(statement, |end| &statement[..=end]);
    // `SELECT ...` in inline code: the closing backtick ends it
    let statement = if cleaned[..start].ends_with('`') {
        statement
            .find('`')
            .map_or(statement, |end| &statement[..end])
    } else {
        statement
    };

    Ok(CandidateQuery(statement.trim().to_string()))
}

/// Whether `sql` begins with the `SELECT` keyword after leading whitespace.
#[must_use]
pub fn starts_with_select(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    let Some(head) = trimmed.get(..6) else {
        return false;
    };
    head.eq_ignore_ascii_case("select")
        && trimmed[6..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
}

/// Removes code-fence markers and REPL markers, then trims.
fn strip_decoration(raw: &str) -> String {
    let without_markers = raw.replace(REPL_MARKER, "");
    without_markers
        .lines()
        .map(strip_fence)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Strips an opening fence (with its language tag) and a closing fence
/// from one line, keeping any code that shares the line.
fn strip_fence(line: &str) -> &str {
    let mut line = match line.trim_start().strip_prefix(FENCE) {
        Some(rest) if starts_with_select(rest) => rest,
        Some(rest) => {
            let tag_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let is_tag = rest[..tag_len]
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
            if is_tag { &rest[tag_len..] } else { rest }
        }
        None => line,
    };
    if let Some(rest) = line.trim_end().strip_suffix(FENCE) {
        line = rest;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(raw: &str) -> String {
        extract_sql(raw)
            .map(CandidateQuery::into_inner)
            .unwrap_or_else(|e| unreachable!("extraction failed: {e}"))
    }

    #[test]
    fn test_fenced_block() {
        assert_eq!(
            sql("```sql\nSELECT name FROM customers;\n```"),
            "SELECT name FROM customers;"
        );
    }

    #[test]
    fn test_single_line_fence_keeps_statement() {
        assert_eq!(
            sql("```sql SELECT name FROM customers;```"),
            "SELECT name FROM customers;"
        );
        assert_eq!(sql("```SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_fence_sharing_lines_with_sql() {
        assert_eq!(
            sql("```sql SELECT name\nFROM customers```"),
            "SELECT name\nFROM customers"
        );
    }

    #[test]
    fn test_inline_code_ends_at_closing_backtick() {
        assert_eq!(
            sql("Use `SELECT name FROM customers` to list them."),
            "SELECT name FROM customers"
        );
        assert_eq!(sql("Run `SELECT 1;` now"), "SELECT 1;");
    }

    #[test]
    fn test_backtick_identifiers_are_kept() {
        assert_eq!(
            sql("SELECT `name` FROM `customers`;"),
            "SELECT `name` FROM `customers`;"
        );
    }

    #[test]
    fn test_leading_prose() {
        assert_eq!(
            sql("Here is the query you asked for:\n\nSELECT id FROM orders WHERE total > 10"),
            "SELECT id FROM orders WHERE total > 10"
        );
    }

    #[test]
    fn test_trailing_commentary_after_semicolon() {
        assert_eq!(
            sql("SELECT 1;\nThis query returns one."),
            "SELECT 1;"
        );
    }

    #[test]
    fn test_first_of_multiple_statements() {
        assert_eq!(sql("SELECT a FROM t; SELECT b FROM u;"), "SELECT a FROM t;");
    }

    #[test]
    fn test_lowercase_and_multiline() {
        assert_eq!(
            sql("select name\nfrom customers\nwhere id = 1"),
            "select name\nfrom customers\nwhere id = 1"
        );
    }

    #[test]
    fn test_repl_markers_removed() {
        assert_eq!(sql(">>> SELECT 42;"), "SELECT 42;");
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        let result = extract_sql("Our selection of tables is SELECTED carefully");
        assert!(matches!(result, Err(NqlError::MalformedOutput { .. })));
    }

    #[test]
    fn test_destructive_sql_is_malformed() {
        let result = extract_sql("DROP TABLE users;");
        assert!(matches!(
            result,
            Err(NqlError::MalformedOutput { ref content }) if content == "DROP TABLE users;"
        ));
    }

    #[test]
    fn test_empty_output_is_malformed() {
        assert!(extract_sql("").is_err());
        assert!(extract_sql("```\n```").is_err());
    }

    #[test]
    fn test_starts_with_select() {
        assert!(starts_with_select("SELECT 1"));
        assert!(starts_with_select("  select\n*"));
        assert!(starts_with_select("SeLeCt"));
        assert!(starts_with_select("SELECT(1)"));
        assert!(!starts_with_select("SELECTED"));
        assert!(!starts_with_select("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!starts_with_select("DELETE FROM t"));
        assert!(!starts_with_select("sel"));
        assert!(!starts_with_select(""));
    }
}
