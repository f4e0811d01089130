//! Line-oriented mode for driving the chatbot from another program.
//!
//! Each non-blank input line is one user turn; each turn produces one
//! pretty-printed JSON object on the output. Logs go to stderr, so the
//! output carries nothing but replies.

use crate::chat::{ChatSession, CompletionGateway, ToolBackend, TurnOutcome};
use crate::error::Result;
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

/// `error_type` for input lines that cannot become a turn
const INVALID_INPUT: &str = "InvalidInput";

/// One reply per input line. A turn always answers with `Response`, even when
/// its text reports a gateway failure; `Error` is for lines that produced no turn.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchReply {
    Response {
        response: String,
        timestamp: String,
        metadata: ResponseMetadata,
    },
    Error {
        error: String,
        timestamp: String,
        metadata: ErrorMetadata,
    },
}

#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub tools_available: Vec<String>,
    pub tools_used: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorMetadata {
    pub tools_available: Vec<String>,
    pub error_type: String,
}

impl BatchReply {
    pub fn from_outcome(outcome: TurnOutcome, tools_available: Vec<String>) -> Self {
        BatchReply::Response {
            response: outcome.text,
            timestamp: Utc::now().to_rfc3339(),
            metadata: ResponseMetadata {
                tools_available,
                tools_used: outcome.tools_used,
            },
        }
    }

    pub fn error(
        error: impl Into<String>,
        error_type: impl Into<String>,
        tools_available: Vec<String>,
    ) -> Self {
        BatchReply::Error {
            error: error.into(),
            timestamp: Utc::now().to_rfc3339(),
            metadata: ErrorMetadata {
                tools_available,
                error_type: error_type.into(),
            },
        }
    }
}

/// Read turns until end of input or until `interrupt` resolves
pub async fn run<G, T, R, W, I>(
    session: &mut ChatSession<G, T>,
    mut input: R,
    mut output: W,
    interrupt: I,
) -> Result<()>
where
    G: CompletionGateway,
    T: ToolBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future<Output = ()>,
{
    info!("Running in batch mode");
    info!(
        "Available tools at startup: {:?}",
        session.available_tool_names()
    );
    tokio::pin!(interrupt);

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = tokio::select! {
            n = input.read_until(b'\n', &mut buf) => n?,
            _ = &mut interrupt => {
                info!("Interrupted, ending batch session");
                break;
            }
        };
        if n == 0 {
            info!("End of input reached");
            break;
        }

        let reply = match std::str::from_utf8(&buf) {
            Err(e) => {
                warn!("Skipping input line that is not valid UTF-8: {}", e);
                BatchReply::error(
                    format!("Input is not valid UTF-8: {}", e),
                    INVALID_INPUT,
                    session.available_tool_names(),
                )
            }
            Ok(line) => {
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }

                info!("Processing user input: {}", text);
                let outcome = tokio::select! {
                    outcome = session.process_turn(text) => outcome,
                    _ = &mut interrupt => {
                        info!("Interrupted during a turn, ending batch session");
                        break;
                    }
                };
                if let Some(kind) = outcome.error_kind {
                    error!("Turn failed ({}): {}", kind, outcome.text);
                }
                BatchReply::from_outcome(outcome, session.available_tool_names())
            }
        };

        let mut rendered = serde_json::to_string_pretty(&reply)?;
        rendered.push('\n');
        output.write_all(rendered.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::{AssistantMessage, ChatMessage, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;
    use tracing::Span;

    /// Answers instantly unless the user asks it to wait
    struct EchoGateway;

    #[async_trait]
    impl CompletionGateway for EchoGateway {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: Option<&[ToolDefinition]>,
        ) -> Result<AssistantMessage> {
            let last = messages
                .last()
                .and_then(|m| m.content.clone())
                .unwrap_or_default();
            if last == "wait" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(AssistantMessage::text(format!("you said {}", last)))
        }
    }

    struct NoTools;

    #[async_trait]
    impl ToolBackend for NoTools {
        async fn call_tool(&mut self, name: &str, _arguments: Value) -> Result<Value> {
            Err(crate::ChatbotError::tool(name, "no tools"))
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn session() -> ChatSession<EchoGateway, NoTools> {
        ChatSession::new(EchoGateway, NoTools, Vec::new(), Span::none())
    }

    fn replies(output: &[u8]) -> Vec<Value> {
        serde_json::Deserializer::from_slice(output)
            .into_iter::<Value>()
            .map(|v| v.unwrap())
            .collect()
    }

    fn outcome(text: &str, tools_used: &[&str], error_kind: Option<&'static str>) -> TurnOutcome {
        TurnOutcome {
            text: text.to_string(),
            tools_used: tools_used.iter().map(|t| t.to_string()).collect(),
            error_kind,
        }
    }

    #[test]
    fn test_response_reply_shape() {
        let reply = BatchReply::from_outcome(
            outcome("It is sunny", &["weather"], None),
            vec!["weather".to_string(), "echo".to_string()],
        );

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["response"], "It is sunny");
        assert_eq!(value["metadata"]["tools_used"][0], "weather");
        assert_eq!(value["metadata"]["tools_available"][1], "echo");
        assert!(value.get("error").is_none());

        let timestamp = value["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_gateway_failure_is_a_response() {
        let reply = BatchReply::from_outcome(
            outcome("Error in final response: API error: 500", &["echo"], Some("GatewayError")),
            vec!["echo".to_string()],
        );

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["response"], "Error in final response: API error: 500");
        assert_eq!(value["metadata"]["tools_used"][0], "echo");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = BatchReply::error("Input is not valid UTF-8", INVALID_INPUT, vec![]);

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["error"], "Input is not valid UTF-8");
        assert_eq!(value["metadata"]["error_type"], "InvalidInput");
        assert_eq!(value["metadata"]["tools_available"], Value::Array(vec![]));
        assert!(value.get("response").is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_session() {
        let mut chat = session();
        let mut output = Vec::<u8>::new();

        run(
            &mut chat,
            &b"\xff\xfe\nhello\n"[..],
            &mut output,
            std::future::pending::<()>(),
        )
        .await
        .unwrap();

        let replies = replies(&output);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["metadata"]["error_type"], "InvalidInput");
        assert_eq!(replies[1]["response"], "you said hello");
    }

    #[tokio::test]
    async fn test_interrupt_during_turn_ends_loop() {
        let mut chat = session();
        let mut output = Vec::<u8>::new();

        let started = std::time::Instant::now();
        run(
            &mut chat,
            &b"hi\nwait\nnever\n"[..],
            &mut output,
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        let replies = replies(&output);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["response"], "you said hi");
    }
}
