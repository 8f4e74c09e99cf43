//! Query executor: runs candidate SQL against the database collaborator.
//!
//! Executors fail closed. Driver errors never escape as `Err`; they come
//! back as [`ExecutionOutcome::Failure`] so the correction loop can feed
//! the error text to the model.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::extract::starts_with_select;
use crate::error::NqlError;

/// A materialized result record: column name → value, in `SELECT` order.
pub type Row = serde_json::Map<String, Value>;

/// Database family, derived from a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    /// PostgreSQL.
    Postgresql,
    /// MySQL / MariaDB.
    Mysql,
    /// SQLite.
    Sqlite,
    /// Unrecognized URL scheme.
    Unknown,
}

impl DatabaseKind {
    /// Classifies a database URL by substring.
    ///
    /// A bare path with no `scheme://` prefix is treated as a SQLite file.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        if url.contains("postgresql") || url.starts_with("postgres://") {
            Self::Postgresql
        } else if url.contains("mysql") {
            Self::Mysql
        } else if url.contains("sqlite") || !url.contains("://") {
            Self::Sqlite
        } else {
            Self::Unknown
        }
    }

    /// Lowercase dialect name used in prompts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a SQLite URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    /// `sqlite://`, `sqlite:///:memory:` or `:memory:`.
    Memory,
    /// A database file.
    File(PathBuf),
}

impl SqliteLocation {
    /// Parses `sqlite:///relative.db`, `sqlite:////abs.db`, `sqlite://`,
    /// `:memory:` or a bare file path.
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let rest = url.strip_prefix("sqlite://").map_or(url, |r| {
            // sqlite:///x → "x", sqlite:////abs → "/abs"
            r.strip_prefix('/').unwrap_or(r)
        });
        if rest.is_empty() || rest == ":memory:" {
            Self::Memory
        } else {
            Self::File(PathBuf::from(rest))
        }
    }

    /// Opens a read-only connection at this location.
    ///
    /// Files are never created: a mistyped path must not turn into an
    /// empty database.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if the file does not exist or
    /// the driver cannot open it.
    pub fn open(&self) -> Result<Connection, NqlError> {
        let conn = match self {
            Self::Memory => Connection::open_in_memory(),
            Self::File(path) => {
                if !path.is_file() {
                    return Err(NqlError::configuration(format!(
                        "SQLite database {} does not exist",
                        path.display()
                    )));
                }
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY
                        | OpenFlags::SQLITE_OPEN_URI
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
            }
        };
        conn.map_err(|e| NqlError::configuration(format!("failed to open SQLite database: {e}")))
    }
}

/// Result of executing one candidate query.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The query ran and all rows were materialized.
    Success {
        /// Result rows.
        rows: Vec<Row>,
        /// Wall-clock execution time.
        elapsed: Duration,
    },
    /// The query was rejected or failed.
    Failure {
        /// Error text, opaque to the pipeline.
        error: String,
        /// Wall-clock time until the failure (zero if rejected before running).
        elapsed: Duration,
    },
}

impl ExecutionOutcome {
    /// Whether the query succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Elapsed time of this execution.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Success { elapsed, .. } | Self::Failure { elapsed, .. } => *elapsed,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            elapsed: Duration::ZERO,
        }
    }
}

/// The database collaborator boundary.
///
/// Implementations must be safe to share across concurrent `chat` calls
/// and must never panic or propagate driver errors.
pub trait QueryExecutor: Send + Sync {
    /// Database family, used to name the dialect in prompts.
    fn kind(&self) -> DatabaseKind;

    /// Executes exactly `sql` and materializes all rows.
    fn execute(&self, sql: &str) -> ExecutionOutcome;
}

/// [`QueryExecutor`] backed by a single `rusqlite` connection.
///
/// Each statement runs under a deadline; a watchdog thread interrupts the
/// connection if the statement outlives it.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
    timeout: Duration,
}

impl SqliteExecutor {
    /// Opens the SQLite database named by `url`.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if the database cannot be opened.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, NqlError> {
        let location = SqliteLocation::parse(url);
        let conn = location.open()?;
        debug!(?location, "opened sqlite database");
        Self::from_connection(conn, timeout)
    }

    /// Wraps an existing connection.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if the busy timeout cannot be set.
    pub fn from_connection(conn: Connection, timeout: Duration) -> Result<Self, NqlError> {
        conn.busy_timeout(timeout)
            .map_err(|e| NqlError::configuration(format!("failed to set busy timeout: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            timeout,
        })
    }

    fn run(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<Row>> {
        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(rusqlite::Error::InvalidQuery);
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), value_to_json(row.get_ref(idx)?));
            }
            out.push(record);
        }
        Ok(out)
    }
}

impl fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteExecutor")
            .field("conn", &"<rusqlite::Connection>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl QueryExecutor for SqliteExecutor {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    fn execute(&self, sql: &str) -> ExecutionOutcome {
        if !starts_with_select(sql) {
            return ExecutionOutcome::rejected("refused to execute a statement that is not a SELECT");
        }

        let Ok(conn) = self.conn.lock() else {
            return ExecutionOutcome::rejected("database connection lock is poisoned");
        };

        let interrupt = conn.get_interrupt_handle();
        let timed_out = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let watchdog = {
            let timed_out = Arc::clone(&timed_out);
            let timeout = self.timeout;
            std::thread::spawn(move || {
                if matches!(
                    done_rx.recv_timeout(timeout),
                    Err(mpsc::RecvTimeoutError::Timeout)
                ) {
                    timed_out.store(true, Ordering::SeqCst);
                    interrupt.interrupt();
                }
            })
        };

        let start = Instant::now();
        let result = Self::run(&conn, sql);
        let elapsed = start.elapsed();

        drop(done_tx);
        let _ = watchdog.join();

        match result {
            Ok(rows) => {
                debug!(rows = rows.len(), ?elapsed, "query succeeded");
                ExecutionOutcome::Success { rows, elapsed }
            }
            Err(e) => {
                let error = if timed_out.load(Ordering::SeqCst) {
                    format!(
                        "query exceeded the {:.1}s timeout and was interrupted",
                        self.timeout.as_secs_f64()
                    )
                } else if matches!(e, rusqlite::Error::InvalidQuery) {
                    "statement is not read-only".to_string()
                } else {
                    e.to_string()
                };
                debug!(%error, ?elapsed, "query failed");
                ExecutionOutcome::Failure { error, elapsed }
            }
        }
    }
}

/// Converts a SQLite value to JSON. Blobs become lowercase hex strings.
fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            use std::fmt::Write;
            let mut hex = String::with_capacity(bytes.len() * 2);
            for b in bytes {
                let _ = write!(hex, "{b:02x}");
            }
            Value::String(hex)
        }
    }
}
