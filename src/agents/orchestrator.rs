//! Turn-taking over the four agents.
//!
//! Each turn appends the user message, asks the selector for one agent,
//! runs it and appends its reply. The orchestrator owns the conversation
//! state, so turns are strictly serialized.

use super::catalog::CatalogBuilder;
use super::composer::QueryComposer;
use super::fetcher::ResultFetcher;
use super::sanitizer::QuerySanitizer;
use super::selector::AgentSelector;
use super::visualizer::Visualizer;
use crate::error::{AgentError, AgentResult};
use crate::models::{AgentRole, ConversationState};
use crate::tools::{format_as_table, looks_like_sql};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Limits on a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Session ends after this many turns
    pub max_turns: Option<usize>,
    /// Upper bound on one turn, selection included
    pub turn_timeout: Option<Duration>,
}

/// The workers a turn can be routed to.
pub struct Agents {
    pub catalog: CatalogBuilder,
    pub composer: QueryComposer,
    pub sanitizer: QuerySanitizer,
    pub fetcher: ResultFetcher,
    pub visualizer: Visualizer,
}

#[derive(Debug)]
pub enum TurnOutcome {
    Replied { agent: AgentRole, content: String },
    Failed { agent: AgentRole, error: AgentError },
    /// The turn was cut short by a session limit
    Aborted { reason: String },
}

impl TurnOutcome {
    /// Text shown to the user.
    pub fn render(&self) -> String {
        match self {
            Self::Replied { content, .. } => content.clone(),
            Self::Failed { agent, error } => {
                let mut text = format!("{} failed ({}): {}", agent, error.kind(), error);
                if let AgentError::Database(db_error) = error {
                    if let Some(hint) = db_error.suggestion().filter(|h| !h.is_empty()) {
                        text.push_str(&format!("\nSuggestion: {}", hint));
                    }
                }
                text
            }
            Self::Aborted { reason } => format!("Turn aborted: {}", reason),
        }
    }

    pub fn agent(&self) -> Option<AgentRole> {
        match self {
            Self::Replied { agent, .. } | Self::Failed { agent, .. } => Some(*agent),
            Self::Aborted { .. } => None,
        }
    }
}

pub struct Orchestrator {
    selector: Box<dyn AgentSelector>,
    agents: Agents,
    state: ConversationState,
    config: OrchestratorConfig,
    turns: usize,
}

impl Orchestrator {
    pub fn new(agents: Agents, selector: Box<dyn AgentSelector>, config: OrchestratorConfig) -> Self {
        Self {
            selector,
            agents,
            state: ConversationState::new(),
            config,
            turns: 0,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn turns(&self) -> usize {
        self.turns
    }

    /// True once `max_turns` turns have run.
    pub fn is_exhausted(&self) -> bool {
        self.config
            .max_turns
            .is_some_and(|max| self.turns >= max)
    }

    /// Run one user turn.
    pub async fn handle_turn(&mut self, input: &str) -> TurnOutcome {
        if self.is_exhausted() {
            return TurnOutcome::Aborted {
                reason: format!("turn limit of {} reached", self.turns),
            };
        }
        self.turns += 1;
        self.state.push_user(input);

        let start = Instant::now();
        let outcome = match self.config.turn_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run_turn(input)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "Turn timed out");
                    return TurnOutcome::Aborted {
                        reason: AgentError::timeout("turn", limit.as_secs()).to_string(),
                    };
                }
            },
            None => self.run_turn(input).await,
        };

        match &outcome {
            TurnOutcome::Replied { agent, content } => {
                info!(
                    agent = %agent,
                    turn = self.turns,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Turn completed"
                );
                self.state.push_agent(*agent, content.clone());
            }
            TurnOutcome::Failed { agent, error } => {
                warn!(agent = %agent, kind = error.kind(), error = %error, "Turn failed");
                self.state.push_agent(*agent, outcome.render());
            }
            TurnOutcome::Aborted { .. } => {}
        }
        outcome
    }

    async fn run_turn(&mut self, input: &str) -> TurnOutcome {
        let agent = self.select_agent().await;
        let result = match agent {
            AgentRole::Cataloging => self.run_catalog().await,
            AgentRole::QueryGen => self.run_query_gen(input).await,
            AgentRole::DataExtractor => self.run_extraction(input).await,
            AgentRole::DataViz => self.run_visualization(),
        };

        match result {
            Ok(content) => TurnOutcome::Replied { agent, content },
            Err(error) => TurnOutcome::Failed { agent, error },
        }
    }

    async fn select_agent(&self) -> AgentRole {
        let has_result = self.state.has_last_result();
        let agent = self.selector.select(self.state.messages(), has_result).await;
        if agent == AgentRole::DataViz && !has_result {
            warn!("DataViz selected without a retrieved result, using DataExtractor");
            return AgentRole::DataExtractor;
        }
        agent
    }

    async fn run_catalog(&mut self) -> AgentResult<String> {
        let report = self.agents.catalog.summarize_all_tables().await?;
        let summaries = self.agents.catalog.store().load_all().await?;

        self.agents.sanitizer.set_index(report.index.clone());
        self.agents.composer.set_catalog(summaries, report.index.clone());

        let mut reply = report.summary_line();
        for failure in &report.failed {
            reply.push_str(&format!("\n- {}: {}", failure.table, failure.error));
        }
        Ok(reply)
    }

    async fn run_query_gen(&mut self, input: &str) -> AgentResult<String> {
        let raw = self.agents.composer.compose_query(input).await?;
        let sql = self.agents.sanitizer.sanitize(&raw);
        self.state.set_last_generated_sql(sql.clone());
        Ok(sql)
    }

    async fn run_extraction(&mut self, input: &str) -> AgentResult<String> {
        let dialect = self.agents.composer.dialect();
        let raw = if looks_like_sql(input, dialect) {
            input.to_string()
        } else {
            match self.state.last_generated_sql() {
                Some(sql) if refers_to_previous_query(input) => sql.to_string(),
                _ => self.agents.composer.compose_query(input).await?,
            }
        };

        let sql = self.agents.sanitizer.sanitize(&raw);
        let result = self.agents.fetcher.execute(&sql).await?;
        let table = format_as_table(&result);

        self.state.set_last_generated_sql(sql.clone());
        self.state.set_last_result(result);
        Ok(format!("{}\n{}", sql, table))
    }

    fn run_visualization(&self) -> AgentResult<String> {
        let result = self
            .state
            .last_result()
            .ok_or_else(|| AgentError::no_result("no data has been retrieved yet"))?;
        Ok(self.agents.visualizer.render(result))
    }
}

/// Words allowed in a request to re-run the last generated query.
const RERUN_WORDS: &[&str] = &[
    "run", "execute", "it", "that", "this", "the", "query", "sql", "please", "again", "now",
    "can", "you", "go", "ahead",
];

/// "run it", "execute that query" and similar, with nothing else in the request.
fn refers_to_previous_query(input: &str) -> bool {
    let lower = input.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    words.iter().any(|w| matches!(*w, "run" | "execute"))
        && words.iter().all(|w| RERUN_WORDS.contains(w))
}
