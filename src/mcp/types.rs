//! JSON-RPC 2.0 message model for the MCP stdio wire.
//!
//! Each variant carries only the fields that belong to it. Conversion to and
//! from the flat wire object happens in [`Message::to_line`] and
//! [`Message::from_line`]; absent fields are omitted, never written as `null`.

use crate::error::{ChatbotError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Opaque correlation token. Written as a string; numeric ids read from the
/// wire are normalised to their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_wire(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s)),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub outcome: Outcome,
}

/// Exactly one of `result` or `error`
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for ChatbotError {
    fn from(err: RpcError) -> Self {
        ChatbotError::Protocol {
            code: err.code,
            message: err.message,
        }
    }
}

impl Response {
    /// Unwrap the result payload, turning an `error` object into `ChatbotError::Protocol`
    pub fn into_result(self) -> Result<Value> {
        match self.outcome {
            Outcome::Result(value) => Ok(value),
            Outcome::Error(err) => Err(err.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
}

/// Flat on-the-wire shape shared by every variant
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireMessage {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    error: Option<Value>,
}

/// Distinguishes a field that is present with `null` from one that is absent
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Message {
    pub fn request(id: impl Into<RequestId>, method: &str, params: Option<Value>) -> Self {
        Message::Request(Request {
            id: id.into(),
            method: method.to_string(),
            params,
        })
    }

    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Message::Notification(Notification {
            method: method.to_string(),
            params,
        })
    }

    /// Serialize to a single wire line, without the trailing newline
    pub fn to_line(&self) -> Result<String> {
        let mut wire = WireMessage {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            ..Default::default()
        };

        match self {
            Message::Request(req) => {
                wire.id = Some(Value::String(req.id.0.clone()));
                wire.method = Some(req.method.clone());
                wire.params = req.params.clone();
            }
            Message::Notification(note) => {
                wire.method = Some(note.method.clone());
                wire.params = note.params.clone();
            }
            Message::Response(resp) => {
                wire.id = Some(Value::String(resp.id.0.clone()));
                match &resp.outcome {
                    Outcome::Result(value) => wire.result = Some(value.clone()),
                    Outcome::Error(err) => wire.error = Some(serde_json::to_value(err)?),
                }
            }
        }

        Ok(serde_json::to_string(&wire)?)
    }

    /// Parse one wire line into the variant its fields describe
    pub fn from_line(line: &str) -> Result<Message> {
        let trimmed = line.trim();
        let wire: WireMessage = serde_json::from_str(trimmed)
            .map_err(|e| ChatbotError::malformed(format!("invalid JSON: {}", e), trimmed))?;

        if wire.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            let found = wire.jsonrpc.as_deref().unwrap_or("missing");
            return Err(ChatbotError::malformed(
                format!("unsupported jsonrpc version: {}", found),
                trimmed,
            ));
        }

        let id = match wire.id {
            None | Some(Value::Null) => None,
            Some(value) => Some(RequestId::from_wire(value).ok_or_else(|| {
                ChatbotError::malformed("id must be a string or number", trimmed)
            })?),
        };

        if let Some(method) = wire.method {
            return Ok(match id {
                Some(id) => Message::Request(Request {
                    id,
                    method,
                    params: wire.params,
                }),
                None => Message::Notification(Notification {
                    method,
                    params: wire.params,
                }),
            });
        }

        let id = id.ok_or_else(|| ChatbotError::malformed("response without id", trimmed))?;

        let outcome = match (wire.error, wire.result) {
            (Some(error), _) if !error.is_null() => {
                let err: RpcError = serde_json::from_value(error).map_err(|e| {
                    ChatbotError::malformed(format!("invalid error object: {}", e), trimmed)
                })?;
                Outcome::Error(err)
            }
            (_, Some(result)) => Outcome::Result(result),
            _ => {
                return Err(ChatbotError::malformed(
                    "response carries neither result nor error",
                    trimmed,
                ))
            }
        };

        Ok(Message::Response(Response { id, outcome }))
    }
}

// ─── MCP payloads ────────────────────────────────────────────────────────────

/// A tool as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "inputSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}
