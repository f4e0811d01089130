use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start tool server '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("Tool server pipe closed: {0}")]
    PipeClosed(String),

    #[error("Timed out after {timeout_ms}ms waiting for {waiting_for}")]
    Timeout { waiting_for: String, timeout_ms: u64 },

    #[error("MCP protocol error [{code}]: {message}")]
    Protocol { code: i64, message: String },

    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String, raw: String },

    #[error("Client is {state}, cannot {operation}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },

    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    ArgumentParse { tool: String, reason: String },

    #[error("{0}")]
    Gateway(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

}

pub type Result<T> = std::result::Result<T, ChatbotError>;

impl ChatbotError {
    pub fn spawn(command: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ChatbotError::Spawn {
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(waiting_for: impl Into<String>, timeout: std::time::Duration) -> Self {
        ChatbotError::Timeout {
            waiting_for: waiting_for.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        ChatbotError::MalformedMessage {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ChatbotError::Tool {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        ChatbotError::Gateway(message.into())
    }

    /// Stable short name, reported as `error_type` in batch replies.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatbotError::Config(_) => "ConfigError",
            ChatbotError::Spawn { .. } => "SpawnError",
            ChatbotError::PipeClosed(_) => "PipeClosed",
            ChatbotError::Timeout { .. } => "ProtocolTimeout",
            ChatbotError::Protocol { .. } => "ProtocolError",
            ChatbotError::MalformedMessage { .. } => "MalformedMessage",
            ChatbotError::InvalidState { .. } => "InvalidState",
            ChatbotError::Tool { .. } => "ToolError",
            ChatbotError::ArgumentParse { .. } => "ArgumentParseError",
            ChatbotError::Gateway(_) => "GatewayError",
            ChatbotError::Io(_) => "IoError",
            ChatbotError::Json(_) => "JsonError",
        }
    }
}
