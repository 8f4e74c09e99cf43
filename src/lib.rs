//! # nql-rs
//!
//! Natural-language questions to SQL, grounded on a schema description and
//! repaired by the model when the database rejects them.
//!
//! The core is a bounded generate/execute/correct loop:
//!
//! ```text
//! question → prompt → model → extract SELECT → execute
//!                ↑                               │ failure
//!                └──── correction prompt ←───────┘ (while retries remain)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nql_rs::agent::{ChatOptions, NqlConfig, Orchestrator, create_provider};
//! use nql_rs::schema::SchemaContext;
//!
//! # async fn run() -> Result<(), nql_rs::NqlError> {
//! let config = NqlConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let schema = SchemaContext::from_file("schema.txt")?;
//!
//! let mut orchestrator = Orchestrator::new(Arc::from(provider), config, schema);
//! orchestrator.connect("sqlite:///shop.db")?;
//!
//! let result = orchestrator
//!     .chat("How many customers are there?", ChatOptions::default())
//!     .await?;
//! let retries = result.retries_used;
//! let rows = result.into_rows()?;
//! println!("{} rows after {retries} retries", rows.len());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod schema;
pub mod sql;

pub use agent::{Answer, ChatOptions, ChatOutcome, ChatResult, NqlConfig, Orchestrator};
pub use error::{CommandError, Error, NqlError, Result};
pub use schema::SchemaContext;
pub use sql::{CandidateQuery, ExecutionOutcome, QueryExecutor, SqliteExecutor};
