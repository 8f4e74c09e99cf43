//! SQLite schema dumper.
//!
//! Writes the free-text schema description the prompts are grounded on:
//!
//! ```text
//! Table: orders
//! - id (INTEGER NOT NULL PRIMARY KEY)
//! - customer_id (INTEGER FOREIGN KEY -> customers.id)
//! Index: idx_orders_customer on columns (customer_id)
//! Check Constraint: total >= 0
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::error::NqlError;
use crate::sql::{DatabaseKind, SqliteLocation};

/// Renders the schema of every user table in `conn`.
///
/// # Errors
///
/// Returns the driver error if any catalog query fails.
pub fn extract_sqlite_schema(conn: &Connection) -> rusqlite::Result<String> {
    let mut stmt = conn.prepare(
        "SELECT name, COALESCE(sql, '') FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let tables: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let mut out = String::new();
    for (table, create_sql) in &tables {
        let _ = writeln!(out, "Table: {table}");

        let foreign_keys = foreign_keys(conn, table)?;
        let indexes = indexes(conn, table)?;
        let unique_columns: HashSet<&str> = indexes
            .iter()
            .filter(|idx| idx.unique && idx.columns.len() == 1)
            .map(|idx| idx.columns[0].as_str())
            .collect();

        let mut cols = conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let mut rows = cols.query([table])?;
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let col_type: String = row.get(1)?;
            let not_null: bool = row.get(2)?;
            let default: Option<String> = row.get(3)?;
            let pk: i64 = row.get(4)?;

            let mut parts = Vec::new();
            if !col_type.is_empty() {
                parts.push(col_type);
            }
            if not_null {
                parts.push("NOT NULL".to_string());
            }
            if pk > 0 {
                parts.push("PRIMARY KEY".to_string());
            }
            if unique_columns.contains(name.as_str()) {
                parts.push("UNIQUE".to_string());
            }
            if let Some(default) = default {
                parts.push(format!("DEFAULT {default}"));
            }
            if let Some(targets) = foreign_keys.get(&name) {
                for target in targets {
                    parts.push(format!("FOREIGN KEY -> {target}"));
                }
            }
            let _ = writeln!(out, "- {name} ({})", parts.join(" "));
        }

        for idx in indexes.iter().filter(|idx| idx.origin == "c") {
            let _ = writeln!(
                out,
                "Index: {} on columns ({})",
                idx.name,
                idx.columns.join(", ")
            );
        }
        for check in check_constraints(create_sql) {
            let _ = writeln!(out, "Check Constraint: {check}");
        }
        out.push('\n');
    }
    Ok(out)
}

/// Dumps the schema of the SQLite database at `database_url` into `output`.
///
/// # Errors
///
/// Returns [`NqlError::Configuration`] for non-SQLite URLs, missing or
/// unreadable databases, databases without tables, and unwritable output.
pub fn write_schema_file(database_url: &str, output: &Path) -> Result<usize, NqlError> {
    let kind = DatabaseKind::from_url(database_url);
    if kind != DatabaseKind::Sqlite {
        return Err(NqlError::configuration(format!(
            "schema extraction supports SQLite only, got a {kind} URL"
        )));
    }

    let conn = SqliteLocation::parse(database_url).open()?;
    let schema = extract_sqlite_schema(&conn)
        .map_err(|e| NqlError::configuration(format!("failed to read schema: {e}")))?;
    if schema.is_empty() {
        return Err(NqlError::configuration(format!(
            "{database_url} has no tables to describe"
        )));
    }

    std::fs::write(output, &schema).map_err(|e| {
        NqlError::configuration(format!("failed to write {}: {e}", output.display()))
    })?;
    info!(output = %output.display(), bytes = schema.len(), "schema written");
    Ok(schema.len())
}

struct IndexInfo {
    name: String,
    unique: bool,
    /// `c` = CREATE INDEX, `u` = UNIQUE constraint, `pk` = primary key.
    origin: String,
    columns: Vec<String>,
}

fn indexes(conn: &Connection, table: &str) -> rusqlite::Result<Vec<IndexInfo>> {
    let mut stmt =
        conn.prepare("SELECT name, \"unique\", origin FROM pragma_index_list(?1) ORDER BY name")?;
    let listed: Vec<(String, bool, String)> = stmt
        .query_map([table], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let mut info_stmt =
        conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    listed
        .into_iter()
        .map(|(name, unique, origin)| {
            let columns = info_stmt
                .query_map([&name], |row| row.get::<_, Option<String>>(0))?
                .filter_map(Result::transpose)
                .collect::<rusqlite::Result<_>>()?;
            Ok(IndexInfo {
                name,
                unique,
                origin,
                columns,
            })
        })
        .collect()
}

/// Maps column name → `table.column` targets.
fn foreign_keys(conn: &Connection, table: &str) -> rusqlite::Result<HashMap<String, Vec<String>>> {
    let mut stmt =
        conn.prepare("SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1)")?;
    let mut rows = stmt.query([table])?;
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let from: String = row.get(0)?;
        let target_table: String = row.get(1)?;
        let to: Option<String> = row.get(2)?;
        let target = to.map_or_else(|| target_table.clone(), |col| format!("{target_table}.{col}"));
        map.entry(from).or_default().push(target);
    }
    Ok(map)
}

/// Pulls `CHECK (...)` bodies out of a `CREATE TABLE` statement.
///
/// SQLite keeps no catalog of check constraints, so the original DDL is
/// scanned with balanced-parenthesis matching.
fn check_constraints(create_sql: &str) -> Vec<String> {
    let upper = create_sql.to_ascii_uppercase();
    let bytes = create_sql.as_bytes();
    let mut checks = Vec::new();
    let mut search_from = 0;

    while let Some(pos) = upper[search_from..].find("CHECK") {
        let keyword_end = search_from + pos + "CHECK".len();
        search_from = keyword_end;

        let rest = &create_sql[keyword_end..];
        let Some(open_offset) = rest.find(|c: char| !c.is_whitespace()) else {
            break;
        };
        if bytes[keyword_end + open_offset] != b'(' {
            continue;
        }

        let body_start = keyword_end + open_offset + 1;
        let mut depth = 1usize;
        let mut end = None;
        for (i, b) in bytes.iter().enumerate().skip(body_start) {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            break;
        };
        checks.push(create_sql[body_start..end].trim().to_string());
        search_from = end;
    }
    checks
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DDL: &str = "
        CREATE TABLE customers (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT
        );
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            total REAL DEFAULT 0 CHECK (total >= 0),
            placed_at TEXT
        );
        CREATE INDEX idx_orders_customer ON orders (customer_id, placed_at);
    ";

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap_or_else(|e| panic!("open failed: {e}"));
        conn.execute_batch(DDL)
            .unwrap_or_else(|e| panic!("ddl failed: {e}"));
        conn
    }

    #[test]
    fn test_extract_tables_and_columns() {
        let schema = extract_sqlite_schema(&seeded()).unwrap_or_else(|e| panic!("{e}"));
        assert!(schema.contains("Table: customers\n"));
        assert!(schema.contains("Table: orders\n"));
        assert!(schema.contains("- id (INTEGER PRIMARY KEY)"));
        assert!(schema.contains("- email (TEXT NOT NULL UNIQUE)"));
        assert!(schema.contains("- customer_id (INTEGER NOT NULL FOREIGN KEY -> customers.id)"));
        assert!(schema.contains("- total (REAL DEFAULT 0)"));
        assert!(schema.contains("Index: idx_orders_customer on columns (customer_id, placed_at)"));
        assert!(schema.contains("Check Constraint: total >= 0"));
        // customers sorts before orders
        assert!(schema.find("Table: customers") < schema.find("Table: orders"));
    }

    #[test]
    fn test_check_constraints_nested_parens() {
        let checks = check_constraints(
            "CREATE TABLE t (a INT CHECK (a IN (1, 2)), b INT, CHECK(length(b) > 0))",
        );
        assert_eq!(checks, vec!["a IN (1, 2)", "length(b) > 0"]);
    }

    #[test]
    fn test_write_schema_file() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let db = dir.path().join("shop.db");
        {
            let conn = Connection::open(&db).unwrap_or_else(|e| panic!("{e}"));
            conn.execute_batch(DDL).unwrap_or_else(|e| panic!("{e}"));
        }
        let out = dir.path().join("shop.txt");
        let url = format!("sqlite:///{}", db.display());
        let written = write_schema_file(&url, &out).unwrap_or_else(|e| panic!("{e}"));
        let text = std::fs::read_to_string(&out).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(written, text.len());
        assert!(text.contains("Table: orders"));
    }

    #[test]
    fn test_write_schema_file_rejects_other_databases() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let result = write_schema_file(
            "postgresql://user@localhost/shop",
            &dir.path().join("schema.txt"),
        );
        assert!(matches!(result, Err(NqlError::Configuration { .. })));
    }

    #[test]
    fn test_write_schema_file_missing_database() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let db = dir.path().join("typo.db");
        let out = dir.path().join("schema.txt");
        let url = format!("sqlite:///{}", db.display());

        let result = write_schema_file(&url, &out);
        assert!(matches!(result, Err(NqlError::Configuration { .. })));
        assert!(!db.exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_write_schema_file_empty_database() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let db = dir.path().join("empty.db");
        Connection::open(&db)
            .and_then(|c| c.execute_batch("PRAGMA user_version = 1;"))
            .unwrap_or_else(|e| panic!("{e}"));
        let out = dir.path().join("schema.txt");

        let result = write_schema_file(&format!("sqlite:///{}", db.display()), &out);
        assert!(matches!(result, Err(NqlError::Configuration { .. })));
        assert!(!out.exists());
    }
}
