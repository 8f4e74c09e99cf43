//! Schema context used to ground every prompt.
//!
//! The schema description is free text (tables, columns, constraints). It
//! is loaded once, never parsed, and embedded verbatim in every prompt.

pub mod extract;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::NqlError;

pub use extract::{extract_sqlite_schema, write_schema_file};

/// Extension appended when a schema is referenced by name.
const SCHEMA_FILE_EXTENSION: &str = "txt";

/// Immutable, non-empty schema description.
///
/// Cloning is cheap; all clones share the same text.
#[derive(Clone, PartialEq, Eq)]
pub struct SchemaContext {
    text: Arc<str>,
}

impl SchemaContext {
    /// Creates a schema context from in-memory text.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if the text is empty or whitespace.
    pub fn from_text(text: impl Into<String>) -> Result<Self, NqlError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(NqlError::configuration("schema description is empty"));
        }
        Ok(Self {
            text: Arc::from(text),
        })
    }

    /// Loads a schema description from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if the file cannot be read or is empty.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NqlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NqlError::configuration(format!(
                "failed to read schema file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_text(text).map_err(|_| {
            NqlError::configuration(format!("schema file {} is empty", path.display()))
        })
    }

    /// Loads `<name>.txt`, the by-name convention for schema files.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaContext::from_file`].
    pub fn from_name(name: &str) -> Result<Self, NqlError> {
        Self::from_file(Path::new(name).with_extension(SCHEMA_FILE_EXTENSION))
    }

    /// The schema text, verbatim.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Debug for SchemaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaContext")
            .field("len", &self.text.len())
            .finish()
    }
}

impl fmt::Display for SchemaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_text_verbatim() {
        let text = "Table: customers\n- id (INTEGER PRIMARY KEY)\n";
        let schema = SchemaContext::from_text(text).unwrap_or_else(|_| unreachable!());
        assert_eq!(schema.as_str(), text);
    }

    #[test]
    fn test_from_text_rejects_empty() {
        assert!(matches!(
            SchemaContext::from_text(""),
            Err(NqlError::Configuration { .. })
        ));
        assert!(matches!(
            SchemaContext::from_text("  \n\t"),
            Err(NqlError::Configuration { .. })
        ));
    }

    #[test]
    fn test_from_file_and_name() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("shop.txt");
        std::fs::write(&path, "Table: orders\n").unwrap_or_else(|_| unreachable!());

        let by_path = SchemaContext::from_file(&path).unwrap_or_else(|_| unreachable!());
        assert_eq!(by_path.as_str(), "Table: orders\n");

        let name = dir.path().join("shop");
        let by_name = SchemaContext::from_name(&name.to_string_lossy())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(by_name, by_path);
    }

    #[test]
    fn test_from_file_missing() {
        let result = SchemaContext::from_file("/nonexistent/schema.txt");
        assert!(matches!(result, Err(NqlError::Configuration { .. })));
    }

    #[test]
    fn test_debug_hides_content() {
        let schema = SchemaContext::from_text("secret table layout").unwrap_or_else(|_| unreachable!());
        let debug = format!("{schema:?}");
        assert!(!debug.contains("secret"));
    }
}
