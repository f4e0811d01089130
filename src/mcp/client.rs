use super::transport::Transport;
use super::types::{ListToolsResult, Message, RequestId, Response, ToolDescriptor};
use crate::chat::ToolBackend;
use crate::config::McpConfig;
use crate::error::{ChatbotError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl ClientState {
    fn as_str(&self) -> &'static str {
        match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::Initializing => "initializing",
            ClientState::Ready => "ready",
            ClientState::Closed => "closed",
        }
    }
}

/// Identity sent in the `initialize` handshake
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub protocol_version: String,
    pub name: String,
    pub version: String,
}

impl From<&McpConfig> for ClientInfo {
    fn from(config: &McpConfig) -> Self {
        Self {
            protocol_version: config.protocol_version.clone(),
            name: config.client_name.clone(),
            version: config.client_version.clone(),
        }
    }
}

/// JSON-RPC client for a single stdio MCP server.
///
/// At most one request is in flight: the line read after a request is taken
/// as its response, with no id-indexed dispatch. `send` takes `&mut self`,
/// so overlapping calls on one client cannot be expressed.
pub struct McpClient {
    transport: Transport,
    state: ClientState,
    info: ClientInfo,
    request_timeout: Duration,
    last_id: u64,
    pending: Option<RequestId>,
}

impl McpClient {
    pub fn new(transport: Transport, info: ClientInfo, request_timeout: Duration) -> Self {
        Self {
            transport,
            state: ClientState::Uninitialized,
            info,
            request_timeout,
            last_id: 0,
            pending: None,
        }
    }

    /// Spawn the configured server; the handshake is still pending
    pub fn start(config: &McpConfig) -> Result<Self> {
        let argv = config.command_argv()?;
        let transport = Transport::start(&argv)?;
        Ok(Self::new(
            transport,
            ClientInfo::from(config),
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Id of the request currently awaiting its response, if any
    pub fn pending(&self) -> Option<&RequestId> {
        self.pending.as_ref()
    }

    pub fn stderr_tail(&self) -> Vec<String> {
        self.transport.stderr_tail()
    }

    /// Perform the `initialize` handshake. Any failure closes the client.
    pub async fn initialize(&mut self) -> Result<Value> {
        if self.state != ClientState::Uninitialized {
            return Err(self.invalid_state("initialize"));
        }
        self.state = ClientState::Initializing;

        let params = json!({
            "protocolVersion": self.info.protocol_version,
            "capabilities": {
                "tools": {}
            },
            "clientInfo": {
                "name": self.info.name,
                "version": self.info.version,
            }
        });

        let result = match self.send("initialize", Some(params)).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };

        let server_info = match result {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to initialize MCP server: {}", e);
                self.state = ClientState::Closed;
                return Err(e);
            }
        };
        info!("MCP server initialized successfully");

        // Servers differ on whether they expect this
        match self
            .notify("notifications/initialized", Some(json!({})))
            .await
        {
            Ok(()) => debug!("Sent initialized notification"),
            Err(e) => warn!(
                "Could not send initialized notification (this may be normal): {}",
                e
            ),
        }

        self.state = ClientState::Ready;
        Ok(server_info)
    }

    /// List the server's tools. Failures are logged and yield an empty list.
    pub async fn list_tools(&mut self) -> Vec<ToolDescriptor> {
        if self.state != ClientState::Ready {
            warn!("Not listing tools: client is {}", self.state.as_str());
            return Vec::new();
        }

        let result = match self.send("tools/list", Some(json!({}))).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };

        match result.and_then(|value| Ok(serde_json::from_value::<ListToolsResult>(value)?)) {
            Ok(list) => {
                info!(
                    "Successfully retrieved {} tools from MCP server",
                    list.tools.len()
                );
                list.tools
            }
            Err(e) => {
                error!("Failed to list tools: {}", e);
                Vec::new()
            }
        }
    }

    /// Invoke a tool. Every failure comes back as `ChatbotError::Tool`.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        if self.state != ClientState::Ready {
            return Err(ChatbotError::tool(name, self.invalid_state("call tools")));
        }

        debug!("Calling tool '{}' with args: {}", name, arguments);

        let params = json!({
            "name": name,
            "arguments": arguments,
        });

        let result = match self.send("tools/call", Some(params)).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            error!("Failed to call tool {}: {}", name, e);
            ChatbotError::tool(name, e)
        })
    }

    /// Send a request and take the next line from the server as its response
    pub async fn send(&mut self, method: &str, params: Option<Value>) -> Result<Response> {
        if self.state == ClientState::Closed {
            return Err(self.invalid_state("send requests"));
        }

        self.last_id += 1;
        let id = RequestId::from(self.last_id);
        let line = Message::request(id.clone(), method, params).to_line()?;

        self.pending = Some(id.clone());
        let outcome = self.exchange(method, &line).await;
        self.pending = None;

        let response_line = outcome?;
        match Message::from_line(&response_line) {
            Ok(Message::Response(response)) => {
                if response.id != id {
                    warn!(
                        "Response id '{}' does not match request id '{}' for {}",
                        response.id, id, method
                    );
                }
                Ok(response)
            }
            Ok(other) => {
                error!("Expected a response to {}, got: {}", method, response_line);
                Err(ChatbotError::malformed(
                    format!("expected a response, got {}", variant_name(&other)),
                    response_line,
                ))
            }
            Err(e) => {
                error!("Failed to parse response JSON: {}", e);
                error!("Raw response was: {}", response_line);
                Err(e)
            }
        }
    }

    /// Send a notification; no response is read
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        if self.state == ClientState::Closed {
            return Err(self.invalid_state("send notifications"));
        }

        let line = Message::notification(method, params).to_line()?;
        debug!("Sending notification: {}", line);
        self.transport.write_line(&line).await
    }

    /// Close the session and stop the server process. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.state = ClientState::Closed;
        self.pending = None;
        self.transport.stop().await
    }

    async fn exchange(&mut self, method: &str, line: &str) -> Result<String> {
        debug!("Sending: {}", line);
        self.transport.write_line(line).await?;

        let response_line = self
            .transport
            .read_line(self.request_timeout)
            .await
            .map_err(|e| match e {
                ChatbotError::Timeout { .. } => {
                    error!("Timeout waiting for MCP server response to {}", method);
                    ChatbotError::timeout(format!("response to '{}'", method), self.request_timeout)
                }
                other => other,
            })?;

        debug!("Raw response: {}", response_line);
        Ok(response_line)
    }

    fn invalid_state(&self, operation: &'static str) -> ChatbotError {
        ChatbotError::InvalidState {
            state: self.state.as_str(),
            operation,
        }
    }
}

#[async_trait]
impl ToolBackend for McpClient {
    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn close(&mut self) -> Result<()> {
        McpClient::close(self).await
    }
}

fn variant_name(message: &Message) -> &'static str {
    match message {
        Message::Request(_) => "a request",
        Message::Notification(_) => "a notification",
        Message::Response(_) => "a response",
    }
}
