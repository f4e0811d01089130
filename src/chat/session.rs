//! One chat session: conversation state plus the bounded two-phase turn.
//!
//! A turn asks for a completion with tools enabled, runs any requested tool
//! calls sequentially, then asks for exactly one follow-up completion with
//! tools disabled. A tool request in that follow-up is not acted on, so at
//! most one tool round trip happens per user turn.

use super::conversation::{render_tool_results, Conversation, ConversationTurn};
use super::traits::{CompletionGateway, ToolBackend};
use crate::error::{ChatbotError, Result};
use crate::gateway::types::{ToolCallRequest, ToolDefinition};
use crate::mcp::bridge::{describe_tools, to_function_schemas};
use crate::mcp::types::ToolDescriptor;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::{info, warn, Instrument, Span};

/// Result of one user turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Final assistant text, or an `Error: ...` message when the gateway failed
    pub text: String,
    /// Tools dispatched during this turn, in call order, without repeats
    pub tools_used: Vec<String>,
    /// Short error name when the gateway failed, see [`ChatbotError::kind`]
    pub error_kind: Option<&'static str>,
}

impl TurnOutcome {
    fn reply(text: String, tools_used: Vec<String>) -> Self {
        Self {
            text,
            tools_used,
            error_kind: None,
        }
    }

    fn failed(text: String, tools_used: Vec<String>, err: &ChatbotError) -> Self {
        Self {
            text,
            tools_used,
            error_kind: Some(err.kind()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_kind.is_some()
    }
}

pub struct ChatSession<G, T> {
    gateway: G,
    tools: T,
    available_tools: Vec<ToolDescriptor>,
    // Fixed once the server has been listed
    tool_schema: Vec<ToolDefinition>,
    conversation: Conversation,
    tools_used: BTreeSet<String>,
    span: Span,
}

impl<G, T> ChatSession<G, T>
where
    G: CompletionGateway,
    T: ToolBackend,
{
    /// Build a session over an initialized tool backend. The system prompt
    /// describing `available_tools` becomes the first turn.
    pub fn new(gateway: G, tools: T, available_tools: Vec<ToolDescriptor>, span: Span) -> Self {
        let tool_schema = to_function_schemas(&available_tools);

        let mut conversation = Conversation::new();
        conversation.push(ConversationTurn::System(system_prompt(&available_tools)));

        Self {
            gateway,
            tools,
            available_tools,
            tool_schema,
            conversation,
            tools_used: BTreeSet::new(),
            span,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn available_tool_names(&self) -> Vec<String> {
        self.available_tools.iter().map(|t| t.name.clone()).collect()
    }

    /// Every tool dispatched since the session started
    pub fn tools_used(&self) -> &BTreeSet<String> {
        &self.tools_used
    }

    /// Drive one user message to its final reply
    pub async fn process_turn(&mut self, user_text: &str) -> TurnOutcome {
        let span = self.span.clone();
        self.run_turn(user_text).instrument(span).await
    }

    /// Release the tool backend; stops the server process for MCP sessions
    pub async fn close(&mut self) -> Result<()> {
        let span = self.span.clone();
        async {
            info!("Stopping MCP Chatbot...");
            if !self.tools_used.is_empty() {
                let used: Vec<&str> = self.tools_used.iter().map(String::as_str).collect();
                info!("Tools used this session: {}", used.join(", "));
            }
            let result = self.tools.close().await;
            info!("MCP Chatbot stopped");
            result
        }
        .instrument(span)
        .await
    }

    async fn run_turn(&mut self, user_text: &str) -> TurnOutcome {
        self.conversation
            .push(ConversationTurn::User(user_text.to_string()));

        let tools = (!self.tool_schema.is_empty()).then_some(self.tool_schema.as_slice());
        let first = match self
            .gateway
            .complete(&self.conversation.to_messages(), tools)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!("Completion failed: {}", e);
                return TurnOutcome::failed(format!("Error: {}", e), Vec::new(), &e);
            }
        };

        let Some(calls) = first.requested_calls().map(<[ToolCallRequest]>::to_vec) else {
            let text = first.content.unwrap_or_default();
            self.conversation
                .push(ConversationTurn::Assistant(text.clone()));
            return TurnOutcome::reply(text, Vec::new());
        };

        let (entries, tools_used) = self.run_tool_calls(&calls).await;

        self.conversation.push(ConversationTurn::AssistantToolCalls {
            content: first.content,
            calls,
        });
        self.conversation
            .push(ConversationTurn::ToolResults(render_tool_results(&entries)));
        self.tools_used.extend(tools_used.iter().cloned());

        let follow_up = match self
            .gateway
            .complete(&self.conversation.to_messages(), None)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!("Follow-up completion failed: {}", e);
                return TurnOutcome::failed(
                    format!("Error in final response: {}", e),
                    tools_used,
                    &e,
                );
            }
        };

        if follow_up.requested_calls().is_some() {
            warn!("Ignoring tool calls in follow-up response; one tool round per turn");
        }

        let text = follow_up.content.unwrap_or_default();
        self.conversation
            .push(ConversationTurn::Assistant(text.clone()));
        TurnOutcome::reply(text, tools_used)
    }

    /// Execute calls in the order the model listed them, one at a time
    async fn run_tool_calls(&mut self, calls: &[ToolCallRequest]) -> (Vec<String>, Vec<String>) {
        let mut entries = Vec::with_capacity(calls.len());
        let mut used: Vec<String> = Vec::new();

        for call in calls {
            let name = call.function.name.as_str();

            let result = match parse_arguments(call) {
                Ok(arguments) => {
                    info!("Calling tool: {} with args: {}", name, arguments);
                    if !used.iter().any(|u| u == name) {
                        used.push(name.to_string());
                    }
                    self.tools.call_tool(name, arguments).await
                }
                Err(e) => Err(e),
            };

            let rendered = match result {
                Ok(value) => value,
                Err(e) => {
                    warn!("Tool {} failed: {}", name, e);
                    json!({ "error": e.to_string() })
                }
            };
            let pretty = serde_json::to_string_pretty(&rendered)
                .unwrap_or_else(|_| rendered.to_string());
            entries.push(format!("Tool {} result: {}", name, pretty));
        }

        (entries, used)
    }
}

/// Decode the argument payload into a JSON object
pub fn parse_arguments(call: &ToolCallRequest) -> Result<Value> {
    let tool = &call.function.name;
    let invalid = |reason: String| ChatbotError::ArgumentParse {
        tool: tool.clone(),
        reason,
    };

    let value = match &call.function.arguments {
        Value::Null => return Ok(json!({})),
        Value::String(raw) if raw.trim().is_empty() => return Ok(json!({})),
        Value::String(raw) => serde_json::from_str::<Value>(raw).map_err(|e| invalid(e.to_string()))?,
        other => other.clone(),
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(invalid(format!("expected a JSON object, got {}", value)))
    }
}

fn system_prompt(tools: &[ToolDescriptor]) -> String {
    format!(
        "You are an AI assistant with access to MCP (Model Context Protocol) tools.\n\
         You can use these tools to help answer questions and perform tasks.\n\
         \n\
         Available tools:\n\
         {}\n\
         \n\
         When you need to use a tool, respond with a function call. The tool will be executed and its results provided to you.\n\
         Be helpful, accurate, and use the appropriate tools when needed to provide comprehensive answers.",
        describe_tools(tools)
    )
}
