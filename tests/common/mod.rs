#![allow(dead_code)]

use httpmock::prelude::HttpMockRequest;
use mcp_chatbot::config::{AppConfig, GatewayConfig, McpConfig, RunMode};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ──────────────────────────────────────────────
// Fake MCP tool server
// ──────────────────────────────────────────────

/// A scripted stdio tool server living in its own temp directory.
///
/// It answers `initialize`, `tools/list` and `tools/call` for `echo`, never
/// answers `tools/call` for `slow`, records every line it receives, and writes
/// its pid so tests can check the process was stopped.
pub struct FakeToolServer {
    dir: TempDir,
    script: PathBuf,
}

const ECHO_SERVER: &str = r#"
echo "fake tool server starting" >&2
echo $$ > "$DIR/pid"
while IFS= read -r line; do
  printf '%s\n' "$line" >> "$DIR/received.log"
  id=$(printf '%s' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"fake-tools","version":"0.1.0"}}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"echo","description":"Echoes input","inputSchema":{"type":"object","properties":{"text":{"type":"string"}},"required":["text"]}},{"name":"slow","description":"Never answers"}]}}\n' "$id"
      ;;
    *'"name":"slow"'*)
      ;;
    *'"method":"tools/call"'*)
      text=$(printf '%s' "$line" | sed -n 's/.*"text":"\([^"]*\)".*/\1/p')
      printf '{"jsonrpc":"2.0","id":"%s","result":{"content":[{"type":"text","text":"%s"}]}}\n' "$id" "$text"
      ;;
  esac
done
"#;

const FAILING_INIT_SERVER: &str = r#"
echo $$ > "$DIR/pid"
echo "license check failed" >&2
IFS= read -r line
id=$(printf '%s' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
printf '{"jsonrpc":"2.0","id":"%s","error":{"code":-32603,"message":"server not licensed"}}\n' "$id"
exec cat > /dev/null
"#;

impl FakeToolServer {
    /// Server offering `echo` and `slow`
    pub fn echo() -> Self {
        Self::with_body(ECHO_SERVER)
    }

    /// Server that rejects `initialize`
    pub fn failing_init() -> Self {
        Self::with_body(FAILING_INIT_SERVER)
    }

    fn with_body(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("server.sh");
        let content = format!("DIR='{}'\n{}", dir.path().display(), body);
        std::fs::write(&script, content).unwrap();
        Self { dir, script }
    }

    /// Shell command line that launches this server
    pub fn command(&self) -> String {
        format!("sh {}", self.script.display())
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Every line the server read from its stdin, parsed as JSON
    pub fn received(&self) -> Vec<Value> {
        std::fs::read_to_string(self.dir.path().join("received.log"))
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    pub fn received_methods(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|m| m["method"].as_str().map(str::to_string))
            .collect()
    }

    /// Whether the server process is still alive
    pub fn is_running(&self) -> bool {
        let Ok(pid) = std::fs::read_to_string(self.dir.path().join("pid")) else {
            return false;
        };
        std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

pub fn mcp_config(server: &FakeToolServer, request_timeout_secs: u64) -> McpConfig {
    McpConfig {
        command: server.command(),
        request_timeout_secs,
        ..Default::default()
    }
}

pub fn app_config(server: &FakeToolServer, gateway_url: &str, mode: RunMode) -> AppConfig {
    AppConfig {
        mode,
        mcp: mcp_config(server, 2),
        gateway: GatewayConfig {
            base_url: gateway_url.to_string(),
            request_timeout_secs: 5,
            ..Default::default()
        },
        logging: Default::default(),
    }
}

// ──────────────────────────────────────────────
// Completion gateway helpers
// ──────────────────────────────────────────────

pub fn body_of(req: &HttpMockRequest) -> Value {
    serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap_or_default()
}

/// Content of the last message in a completion request
pub fn last_content(req: &HttpMockRequest) -> String {
    let body = body_of(req);
    body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string()
}

pub fn offers_tools(req: &HttpMockRequest) -> bool {
    body_of(req).get("tools").is_some()
}

pub fn text_reply(content: &str) -> Value {
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

/// Reply requesting one tool call with JSON-string arguments
pub fn tool_call_reply(name: &str, arguments: Value) -> Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

/// Parse the concatenated pretty-printed replies written in batch mode
pub fn batch_replies(output: &[u8]) -> Vec<Value> {
    serde_json::Deserializer::from_slice(output)
        .into_iter::<Value>()
        .map(|v| v.unwrap())
        .collect()
}
