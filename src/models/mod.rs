//! Data models shared across the agents.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod conversation;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{DatabaseType, masked_connection_string};
pub use conversation::{AgentRole, ConversationState, Message, Role};
pub use query::{
    ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, ResultSet,
};
pub use schema::{
    ConstraintKind, ConstraintUsage, LinkedTable, RelationshipEdge, TableMetadata, TableRef,
};
