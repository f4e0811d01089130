pub mod client;
pub mod types;

pub use client::GatewayClient;
pub use types::{AssistantMessage, ChatMessage, Role, ToolCallRequest, ToolDefinition};
