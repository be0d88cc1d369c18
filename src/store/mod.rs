//! File-backed artifacts: table summaries and the schema index.

pub mod schema_index;
pub mod summaries;

pub use schema_index::{DEFAULT_SCHEMA_INDEX_PATH, SchemaIndex};
pub use summaries::{DEFAULT_SUMMARIES_DIR, SummaryStore};
