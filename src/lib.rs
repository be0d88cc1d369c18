//! nlsql-agents library
//!
//! A multi-agent assistant that catalogues a relational database into
//! natural-language table summaries and answers questions over it by
//! generating, sanitizing and executing read-only SQL (SQLite, PostgreSQL,
//! MySQL).

pub mod agents;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod repl;
pub mod store;
pub mod tools;

pub use agents::{Orchestrator, TurnOutcome};
pub use config::Config;
pub use error::{AgentError, DbError};
