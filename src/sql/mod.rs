//! SQL handling: extraction of candidate queries from model output and
//! execution against the database collaborator.

pub mod executor;
pub mod extract;

pub use executor::{
    DatabaseKind, ExecutionOutcome, QueryExecutor, Row, SqliteExecutor, SqliteLocation,
};
pub use extract::{CandidateQuery, extract_sql, starts_with_select};
