//! Append-only conversation history.
//!
//! The full history is replayed to the completion endpoint on every request,
//! so turn order is part of the contract.

use crate::gateway::types::{ChatMessage, Role, ToolCallRequest};

/// Prefix of the aggregated tool-result turn
pub const TOOL_RESULTS_HEADER: &str = "Tool results:";

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationTurn {
    System(String),
    User(String),
    Assistant(String),
    /// Assistant asked for tools; any accompanying text is kept
    AssistantToolCalls {
        content: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// Aggregated results of one tool round trip
    ToolResults(String),
}

impl ConversationTurn {
    pub fn to_message(&self) -> ChatMessage {
        match self {
            ConversationTurn::System(text) => ChatMessage::text(Role::System, text.as_str()),
            ConversationTurn::User(text) => ChatMessage::text(Role::User, text.as_str()),
            ConversationTurn::Assistant(text) => {
                ChatMessage::text(Role::Assistant, text.as_str())
            }
            ConversationTurn::AssistantToolCalls { content, calls } => ChatMessage {
                role: Role::Assistant,
                content: content.clone(),
                tool_calls: Some(calls.clone()),
            },
            // Sent as a user message: local models rarely accept the tool role
            // without call ids, and the gateway may not supply them
            ConversationTurn::ToolResults(text) => ChatMessage::text(Role::User, text.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Messages in the order they were appended
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns.iter().map(ConversationTurn::to_message).collect()
    }
}

/// Render one tool round trip as a single turn body
pub fn render_tool_results(entries: &[String]) -> String {
    format!("{}\n{}", TOOL_RESULTS_HEADER, entries.join("\n"))
}
