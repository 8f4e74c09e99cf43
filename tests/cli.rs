//! End-to-end tests for the `nql-rs` binary.
//!
//! None of these reach a language model: they cover the offline commands
//! and the failures that happen before any network call.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use tempfile::TempDir;

fn nql() -> Command {
    let mut cmd = Command::cargo_bin("nql-rs").unwrap();
    cmd.env_remove("NQL_SCHEMA_FILE")
        .env_remove("NQL_DATABASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn shop_db(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("shop.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE orders (
             id INTEGER PRIMARY KEY,
             customer_id INTEGER REFERENCES customers(id),
             total REAL CHECK (total >= 0)
         );
         CREATE INDEX idx_orders_customer ON orders (customer_id);",
    )
    .unwrap();
    path
}

#[test]
fn help_lists_commands() {
    nql()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("sql"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn schema_extract_writes_description() {
    let dir = TempDir::new().unwrap();
    let db = shop_db(&dir);
    let output = dir.path().join("shop.txt");

    nql()
        .args(["schema", "extract"])
        .arg(format!("sqlite:///{}", db.display()))
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote schema ("));

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("Table: customers"));
    assert!(text.contains("FOREIGN KEY -> customers.id"));
    assert!(text.contains("Index: idx_orders_customer on columns (customer_id)"));
    assert!(text.contains("Check Constraint: total >= 0"));
}

#[test]
fn init_prompts_writes_templates_once() {
    let dir = TempDir::new().unwrap();
    let prompts = dir.path().join("prompts");

    nql()
        .arg("init-prompts")
        .arg("--dir")
        .arg(&prompts)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 prompt template(s)"));

    assert!(prompts.join("generate.md").exists());
    assert!(prompts.join("correct.md").exists());
    assert!(prompts.join("summarize.md").exists());

    nql()
        .args(["--format", "json", "init-prompts", "--dir"])
        .arg(&prompts)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 0"));
}

#[test]
fn chat_without_schema_fails() {
    let dir = TempDir::new().unwrap();
    let db = shop_db(&dir);

    nql()
        .args(["chat", "How many customers?", "--database"])
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no schema given"));
}

#[test]
fn chat_rejects_postgres_before_contacting_the_model() {
    let dir = TempDir::new().unwrap();
    let schema = dir.path().join("schema.txt");
    std::fs::write(&schema, "Table: customers\n- id (INTEGER)\n").unwrap();

    nql()
        .arg("--schema-file")
        .arg(&schema)
        .args(["chat", "How many customers?", "--database", "postgresql://localhost/shop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only SQLite databases can be executed"));
}

#[test]
fn chat_rejects_missing_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let schema = dir.path().join("schema.txt");
    std::fs::write(&schema, "Table: customers\n- id (INTEGER)\n").unwrap();
    let missing = dir.path().join("typo.db");

    nql()
        .arg("--schema-file")
        .arg(&schema)
        .args(["chat", "How many customers?", "--database"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    assert!(!missing.exists());
}

#[test]
fn schema_extract_rejects_missing_database() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("typo.db");
    let output = dir.path().join("schema.txt");

    nql()
        .args(["schema", "extract"])
        .arg(format!("sqlite:///{}", missing.display()))
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    assert!(!missing.exists());
    assert!(!output.exists());
}

#[test]
fn unknown_output_format_is_rejected() {
    nql()
        .args(["--format", "yaml", "init-prompts", "--dir", "unused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown output format"));
}
