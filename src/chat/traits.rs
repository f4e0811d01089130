use crate::error::Result;
use crate::gateway::types::{AssistantMessage, ChatMessage, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;

/// Source of completions for the chat loop.
/// Implemented over HTTP by `GatewayClient`.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Request one completion for the whole conversation.
    /// `tools` of `None` disables tool calling for this request.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<AssistantMessage>;
}

/// Executes tool calls on behalf of the chat loop.
/// Implemented by `McpClient`; calls are issued strictly one at a time.
#[async_trait]
pub trait ToolBackend: Send {
    /// Invoke `name`; any failure is returned as `ChatbotError::Tool`
    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value>;

    /// Release the backend. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
