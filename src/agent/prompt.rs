//! System prompts and the prompt builder.
//!
//! Every prompt embeds the schema verbatim. System prompts come from a
//! [`PromptSet`] (compiled-in defaults, optionally overridden by template
//! files); user messages are assembled by [`PromptBuilder`].

use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::schema::SchemaContext;
use crate::sql::{DatabaseKind, Row};

/// System prompt for SQL generation.
pub const GENERATE_SYSTEM_PROMPT: &str = r"You are an expert SQL assistant{dialect}. Convert natural language questions into SQL queries based on the provided database schema.

## Rules

- Return exactly one SQL SELECT statement and nothing else: no explanations, no markdown.
- Use only tables and columns that appear in the schema.
- Never write INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, TRUNCATE, or any other statement that modifies data or schema.
- If the question asks you to update, delete, or insert data, ignore that part and answer with a SELECT only.
- Resolve relative dates (today, last week, last 30 days) against the date given in the request.";

/// System prompt for SQL correction.
pub const CORRECT_SYSTEM_PROMPT: &str = r"You are an expert SQL assistant{dialect}. A previous SQL query for the question below failed. Fix the error in the SQL query based on the provided database schema.

## Rules

- Read the error message carefully; it names the table, column, or syntax that is wrong.
- Return exactly one corrected SQL SELECT statement and nothing else. Do not write anything more than the fixed query.
- Use only tables and columns that appear in the schema.
- Never write INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, TRUNCATE, or any other statement that modifies data or schema.";

/// System prompt for the human-readable answer.
pub const SUMMARIZE_SYSTEM_PROMPT: &str = r"You are an expert SQL assistant{dialect}. Answer the user's question based on the provided database schema, the executed query, and its results.

## Rules

- Be concise: one or two sentences in plain, human-like language.
- Base the answer only on the query results. If there are no results, say so.
- Do not include SQL in the answer.";

/// Placeholder replaced with the dialect clause in system prompts.
const DIALECT_PLACEHOLDER: &str = "{dialect}";

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/nql-rs/prompts";

/// Filename for the generation prompt template.
const GENERATE_FILENAME: &str = "generate.md";
/// Filename for the correction prompt template.
const CORRECT_FILENAME: &str = "correct.md";
/// Filename for the summarization prompt template.
const SUMMARIZE_FILENAME: &str = "summarize.md";

/// Maximum characters of a malformed response echoed back to the model.
const MAX_ECHOED_OUTPUT: usize = 500;

/// Timestamp format for the `Today is:` line.
const TODAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A set of system prompts for the three prompt modes.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// System prompt for generation.
    pub generate: String,
    /// System prompt for correction.
    pub correct: String,
    /// System prompt for summarization.
    pub summarize: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `NQL_PROMPT_DIR` environment variable
    /// 3. `~/.config/nql-rs/prompts/`
    ///
    /// Each file is loaded independently; a missing or blank file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("NQL_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            generate: load_file(GENERATE_FILENAME, GENERATE_SYSTEM_PROMPT),
            correct: load_file(CORRECT_FILENAME, CORRECT_SYSTEM_PROMPT),
            summarize: load_file(SUMMARIZE_FILENAME, SUMMARIZE_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            generate: GENERATE_SYSTEM_PROMPT.to_string(),
            correct: CORRECT_SYSTEM_PROMPT.to_string(),
            summarize: SUMMARIZE_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (GENERATE_FILENAME, GENERATE_SYSTEM_PROMPT),
            (CORRECT_FILENAME, CORRECT_SYSTEM_PROMPT),
            (SUMMARIZE_FILENAME, SUMMARIZE_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// A fully assembled prompt: system instructions plus user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
}

/// Builds the prompts sent to the model.
///
/// Pure: the same inputs always produce the same text. The current time is
/// passed in by the caller.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema: SchemaContext,
    prompts: PromptSet,
    dialect: Option<DatabaseKind>,
}

impl PromptBuilder {
    /// Creates a builder over the given schema and system prompts.
    #[must_use]
    pub const fn new(schema: SchemaContext, prompts: PromptSet) -> Self {
        Self {
            schema,
            prompts,
            dialect: None,
        }
    }

    /// Names the SQL dialect in system prompts. `Unknown` clears it.
    #[must_use]
    pub fn with_dialect(mut self, dialect: DatabaseKind) -> Self {
        self.dialect = (dialect != DatabaseKind::Unknown).then_some(dialect);
        self
    }

    /// The schema every prompt is grounded on.
    #[must_use]
    pub const fn schema(&self) -> &SchemaContext {
        &self.schema
    }

    /// Initial generation prompt.
    #[must_use]
    pub fn generate(&self, question: &str, now: NaiveDateTime) -> Prompt {
        let user = format!(
            "Today is:\n{today}\n\n\
             Database Schema:\n{schema}\n\n\
             Question:\n\"{question}\"",
            today = now.format(TODAY_FORMAT),
            schema = self.schema.as_str(),
        );
        Prompt {
            system: self.render_system(&self.prompts.generate),
            user,
        }
    }

    /// Correction prompt after a failed attempt.
    ///
    /// `failed_query` is `None` when the previous response held no SQL at
    /// all; `error` is then the synthetic message from
    /// [`malformed_output_message`].
    #[must_use]
    pub fn correct(
        &self,
        question: &str,
        failed_query: Option<&str>,
        error: &str,
        now: NaiveDateTime,
    ) -> Prompt {
        let user = format!(
            "Today is:\n{today}\n\n\
             Database Schema:\n{schema}\n\n\
             Question:\n\"{question}\"\n\n\
             Error:\n{error}\n\n\
             SQL Query:\n{query}",
            today = now.format(TODAY_FORMAT),
            schema = self.schema.as_str(),
            query = failed_query.unwrap_or("(no SQL statement could be extracted from the previous response)"),
        );
        Prompt {
            system: self.render_system(&self.prompts.correct),
            user,
        }
    }

    /// Summarization prompt for the human-readable answer.
    ///
    /// At most `row_limit` rows are serialized; the prompt says how many
    /// were left out.
    #[must_use]
    pub fn summarize(&self, question: &str, query: &str, rows: &[Row], row_limit: usize) -> Prompt {
        let mut user = format!(
            "Database Schema:\n{schema}\n\n\
             Question:\n\"{question}\"\n\n\
             The executed query is:\n{query}\n\n\
             Query Results:\n",
            schema = self.schema.as_str(),
        );

        if rows.is_empty() {
            user.push_str("No results found.");
        } else {
            let shown = &rows[..rows.len().min(row_limit)];
            let json = serde_json::to_string(shown).unwrap_or_else(|_| "[]".to_string());
            user.push_str(&json);
            if shown.len() < rows.len() {
                let _ = write!(
                    user,
                    "\n(showing the first {} of {} rows)",
                    shown.len(),
                    rows.len()
                );
            }
        }

        Prompt {
            system: self.render_system(&self.prompts.summarize),
            user,
        }
    }

    fn render_system(&self, template: &str) -> String {
        let clause = self
            .dialect
            .map_or_else(String::new, |d| format!(", specialized in {d}"));
        template.replace(DIALECT_PLACEHOLDER, &clause)
    }
}

/// Synthetic error text for a response that held no `SELECT` statement.
#[must_use]
pub fn malformed_output_message(raw: &str) -> String {
    let trimmed = raw.trim();
    let echoed: String = trimmed.chars().take(MAX_ECHOED_OUTPUT).collect();
    let ellipsis = if echoed.len() < trimmed.len() { "..." } else { "" };
    if echoed.is_empty() {
        "The previous response was empty. It must contain a single SQL SELECT statement.".to_string()
    } else {
        format!(
            "The previous response did not contain a SQL SELECT statement. \
             It must contain a single SELECT statement and nothing else. \
             The response was:\n{echoed}{ellipsis}"
        )
    }
}
