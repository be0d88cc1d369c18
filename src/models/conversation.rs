//! Conversation state shared by every agent in a session.

use super::query::ResultSet;
use serde::{Deserialize, Serialize};

/// History entries are clipped to this many characters when rendered into a prompt.
const HISTORY_ENTRY_CHARS: usize = 500;

/// The four specialised agents a turn can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentRole {
    Cataloging,
    QueryGen,
    #[default]
    DataExtractor,
    DataViz,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Cataloging,
        AgentRole::QueryGen,
        AgentRole::DataExtractor,
        AgentRole::DataViz,
    ];

    /// Name used in prompts, logs and selection replies.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cataloging => "Cataloging",
            Self::QueryGen => "QueryGen",
            Self::DataExtractor => "DataExtractor",
            Self::DataViz => "DataViz",
        }
    }

    /// Exact (case-insensitive) name lookup.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Author of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Agent(AgentRole),
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Agent(agent) => write!(f, "{}", agent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered history plus the most recent tabular result.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    last_result: Option<ResultSet>,
    last_generated_sql: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn push_agent(&mut self, agent: AgentRole, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Agent(agent),
            content: content.into(),
        });
    }

    /// Most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn last_result(&self) -> Option<&ResultSet> {
        self.last_result.as_ref()
    }

    pub fn has_last_result(&self) -> bool {
        self.last_result.is_some()
    }

    pub fn set_last_result(&mut self, result: ResultSet) {
        self.last_result = Some(result);
    }

    pub fn last_generated_sql(&self) -> Option<&str> {
        self.last_generated_sql.as_deref()
    }

    pub fn set_last_generated_sql(&mut self, sql: impl Into<String>) {
        self.last_generated_sql = Some(sql.into());
    }

    /// Render the history as `Role: content` lines for a selection prompt.
    pub fn render_history(&self) -> String {
        render_messages(&self.messages)
    }
}

/// Render messages as `Role: content` lines, clipping long entries.
pub fn render_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let content = clip(&m.content, HISTORY_ENTRY_CHARS);
            format!("{}: {}", m.role, content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
