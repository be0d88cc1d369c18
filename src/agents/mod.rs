//! The cooperating agents and the orchestrator that routes turns to them.
//!
//! - `walker`: foreign-key relationship discovery
//! - `catalog`: per-table summaries (Cataloging)
//! - `composer`: SQL generation (QueryGen)
//! - `sanitizer`: deterministic SQL cleanup
//! - `fetcher`: read-only execution (DataExtractor)
//! - `visualizer`: rendering of the last result (DataViz)
//! - `selector`: choosing the agent for a turn
//! - `orchestrator`: shared state and the turn loop

pub mod catalog;
pub mod composer;
pub mod fetcher;
pub mod orchestrator;
pub mod sanitizer;
pub mod selector;
pub mod visualizer;
pub mod walker;

pub use catalog::{CatalogBuilder, CatalogReport, TableFailure};
pub use composer::QueryComposer;
pub use fetcher::ResultFetcher;
pub use orchestrator::{Agents, Orchestrator, OrchestratorConfig, TurnOutcome};
pub use sanitizer::QuerySanitizer;
pub use selector::{AgentSelector, LlmSelector, RuleSelector, parse_selection};
pub use visualizer::Visualizer;
pub use walker::{RelationshipReport, SchemaWalker, WalkIssue};
