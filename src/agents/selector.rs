//! Choosing which agent handles a turn.

use crate::llm::LanguageModel;
use crate::models::conversation::render_messages;
use crate::models::{AgentRole, Message, Role};
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps the conversation so far to exactly one agent.
#[async_trait]
pub trait AgentSelector: Send + Sync {
    async fn select(&self, history: &[Message], last_result_present: bool) -> AgentRole;
}

/// Asks the language model to name the agent.
pub struct LlmSelector {
    llm: Arc<dyn LanguageModel>,
}

impl LlmSelector {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub fn build_prompt(history: &[Message], last_result_present: bool) -> String {
        let user_input = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let last_result = if last_result_present {
            "A result retrieved by DataExtractor is available for visualization."
        } else {
            "No result has been retrieved yet, so DataViz cannot be used."
        };
        let agents = AgentRole::ALL
            .iter()
            .map(|role| format!("- {}", role))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Based on the user query, select the appropriate agent:
- If the query involves data retrieval or executing SQL queries, use {extractor}.
- If the query involves generating visualizations based on previously retrieved data, use {viz}.
- If the user specifically asks for an SQL query generation, use {query_gen}.
- If the user asks to refresh or rebuild the table catalogue, use {catalog}.
- Only use {viz} when previously retrieved data exists.

{last_result}

State only the name of the agent selected and nothing more.

User query: '{user_input}'

Available agents:
{agents}

History:
{history}
",
            extractor = AgentRole::DataExtractor,
            viz = AgentRole::DataViz,
            query_gen = AgentRole::QueryGen,
            catalog = AgentRole::Cataloging,
            last_result = last_result,
            user_input = user_input,
            agents = agents,
            history = render_messages(history),
        )
    }
}

#[async_trait]
impl AgentSelector for LlmSelector {
    async fn select(&self, history: &[Message], last_result_present: bool) -> AgentRole {
        let prompt = Self::build_prompt(history, last_result_present);
        match self.llm.complete(&prompt).await {
            Ok(reply) => match parse_selection(&reply) {
                Some(role) => {
                    debug!(agent = %role, "Agent selected");
                    role
                }
                None => {
                    warn!(reply = %reply, "Selection reply names no agent, using DataExtractor");
                    AgentRole::default()
                }
            },
            Err(error) => {
                warn!(error = %error, "Agent selection failed, using DataExtractor");
                AgentRole::default()
            }
        }
    }
}

/// The agent named earliest in `text`, matched as a whole word.
pub fn parse_selection(text: &str) -> Option<AgentRole> {
    AgentRole::ALL
        .into_iter()
        .filter_map(|role| {
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", role.name())).ok()?;
            pattern.find(text).map(|m| (m.start(), role))
        })
        .min_by_key(|(start, _)| *start)
        .map(|(_, role)| role)
}

/// Keyword rules, no model call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSelector;

const CATALOG_WORDS: &[&str] = &["catalog", "catalogue", "summarize tables", "refresh"];
const VIZ_WORDS: &[&str] = &["plot", "chart", "graph", "visualize", "visualise", "histogram"];
const QUERY_GEN_WORDS: &[&str] = &[
    "write a query",
    "write the sql",
    "generate sql",
    "generate a query",
    "sql for",
    "sql query for",
    "show me the sql",
];

#[async_trait]
impl AgentSelector for RuleSelector {
    async fn select(&self, history: &[Message], last_result_present: bool) -> AgentRole {
        let Some(input) = history.iter().rev().find(|m| m.role == Role::User) else {
            return AgentRole::default();
        };
        let input = input.content.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| input.contains(w));

        if has(CATALOG_WORDS) {
            AgentRole::Cataloging
        } else if has(VIZ_WORDS) && last_result_present {
            AgentRole::DataViz
        } else if has(QUERY_GEN_WORDS) {
            AgentRole::QueryGen
        } else {
            AgentRole::DataExtractor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> Vec<Message> {
        vec![Message {
            role: Role::User,
            content: text.to_string(),
        }]
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("DataViz"), Some(AgentRole::DataViz));
        assert_eq!(parse_selection(" queryGen.\n"), Some(AgentRole::QueryGen));
        assert_eq!(
            parse_selection("I pick DataExtractor, not DataViz"),
            Some(AgentRole::DataExtractor)
        );
        assert_eq!(parse_selection("DataVizualizer"), None);
        assert_eq!(parse_selection("no idea"), None);
    }

    #[test]
    fn test_prompt_mentions_last_result() {
        let prompt = LlmSelector::build_prompt(&user("plot it"), false);
        assert!(prompt.contains("User query: 'plot it'"));
        assert!(prompt.contains("DataViz cannot be used"));
        assert!(prompt.contains("State only the name of the agent selected"));
        assert!(prompt.contains("History:\nUser: plot it"));
    }

    #[tokio::test]
    async fn test_rule_selector() {
        let s = RuleSelector;
        assert_eq!(s.select(&user("Refresh the catalog"), false).await, AgentRole::Cataloging);
        assert_eq!(s.select(&user("Plot that"), true).await, AgentRole::DataViz);
        assert_eq!(s.select(&user("Plot that"), false).await, AgentRole::DataExtractor);
        assert_eq!(
            s.select(&user("Write a query for top customers"), false).await,
            AgentRole::QueryGen
        );
        assert_eq!(s.select(&user("How many orders?"), false).await, AgentRole::DataExtractor);
        assert_eq!(s.select(&[], true).await, AgentRole::DataExtractor);
    }
}
