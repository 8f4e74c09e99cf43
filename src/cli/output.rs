//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;

use crate::agent::{Answer, ChatResult};
use crate::sql::Row;

/// Widest cell shown in text tables, in characters.
const MAX_CELL_WIDTH: usize = 60;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything other than `json` is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    #[must_use]
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Formats a generated query.
#[must_use]
pub fn format_sql(sql: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{sql}\n"),
        OutputFormat::Json => format.to_json(&serde_json::json!({ "query": sql })),
    }
}

/// Formats the model listing.
#[must_use]
pub fn format_models(models: &[String], configured: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if models.is_empty() {
                return "No models available.\n".to_string();
            }
            let mut output = String::new();
            for model in models {
                let marker = if model == configured { "*" } else { " " };
                let _ = writeln!(output, "{marker} {model}");
            }
            output
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "models": models,
            "configured": configured,
        })),
    }
}

/// Formats the outcome of `chat` as text.
#[must_use]
pub fn format_chat_result(result: &ChatResult) -> String {
    let mut output = String::new();
    if let Some(query) = &result.query {
        let _ = writeln!(output, "SQL: {query}\n");
    }

    match result.results() {
        Some(rows) => {
            output.push_str(&format_rows(rows));
            match result.answer() {
                Some(Answer::Summary(text)) => {
                    let _ = writeln!(output, "\nAnswer: {text}");
                }
                Some(Answer::Unavailable { reason }) => {
                    let _ = writeln!(output, "\nAnswer unavailable: {reason}");
                }
                None => {}
            }
        }
        None => {
            let _ = writeln!(
                output,
                "Query failed after {} correction(s): {}",
                result.retries_used,
                result.error().unwrap_or("unknown error")
            );
        }
    }

    let _ = write!(
        output,
        "\n---\nRetries: {} | Time: {:.3}s | Tokens: {}\n",
        result.retries_used,
        result.execution_time_seconds(),
        result.total_tokens
    );
    output
}

/// Renders rows as an aligned text table.
#[must_use]
pub fn format_rows(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return "No results found.\n".to_string();
    };

    let columns: Vec<&String> = first.keys().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| row.get(*col).map_or_else(String::new, cell_text))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("{col:<w$}"))
        .collect();
    let _ = writeln!(output, "{}", header.join(" | ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", rule.join("-+-"));
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        let _ = writeln!(output, "{}", line.join(" | ").trim_end());
    }
    let _ = writeln!(
        output,
        "({} row{})",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    );
    output
}

fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_chars(&text, MAX_CELL_WIDTH)
}

/// Truncates to `max` characters, ending with `...` when cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max <= 3 {
        s.chars().take(max).collect()
    } else {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AttemptRecord, ChatOutcome};
    use crate::sql::CandidateQuery;
    use std::time::Duration;

    fn row(id: i64, name: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(id));
        row.insert("name".to_string(), Value::from(name));
        row
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_format_rows_table() {
        let table = format_rows(&[row(1, "Ada"), row(2, "Grace Hopper")]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "id | name");
        assert_eq!(lines[1], "---+-------------");
        assert_eq!(lines[2], "1  | Ada");
        assert_eq!(lines[3], "2  | Grace Hopper");
        assert_eq!(lines[4], "(2 rows)");
    }

    #[test]
    fn test_format_rows_empty() {
        assert_eq!(format_rows(&[]), "No results found.\n");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 8), "hello...");
        assert_eq!(truncate_chars("héllo", 3), "hél");
    }

    #[test]
    fn test_format_chat_result_text() {
        let result = ChatResult {
            query: CandidateQuery::extract("SELECT id, name FROM customers").ok(),
            outcome: ChatOutcome::Success {
                rows: vec![row(1, "Ada")],
                answer: Some(Answer::Summary("There is one customer, Ada.".to_string())),
            },
            execution_time: Duration::from_millis(12),
            retries_used: 1,
            history: Vec::<AttemptRecord>::new(),
            total_tokens: 30,
        };
        let text = format_chat_result(&result);
        assert!(text.starts_with("SQL: SELECT id, name FROM customers"));
        assert!(text.contains("1  | Ada"));
        assert!(text.contains("Answer: There is one customer, Ada."));
        assert!(text.contains("Retries: 1 | Time: 0.012s | Tokens: 30"));
    }

    #[test]
    fn test_format_chat_result_exhausted() {
        let result = ChatResult {
            query: CandidateQuery::extract("SELECT * FROM order").ok(),
            outcome: ChatOutcome::Exhausted {
                error: "near \"order\": syntax error".to_string(),
            },
            execution_time: Duration::ZERO,
            retries_used: 3,
            history: Vec::new(),
            total_tokens: 0,
        };
        let text = format_chat_result(&result);
        assert!(text.contains("Query failed after 3 correction(s): near \"order\": syntax error"));
    }

    #[test]
    fn test_format_models_marks_configured() {
        let models = vec!["llama3.2".to_string(), "qwen2.5-coder:1.5b".to_string()];
        let text = format_models(&models, "llama3.2", OutputFormat::Text);
        assert_eq!(text, "* llama3.2\n  qwen2.5-coder:1.5b\n");
        assert_eq!(format_models(&[], "x", OutputFormat::Text), "No models available.\n");
    }
}
