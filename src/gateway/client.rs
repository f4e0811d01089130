use super::types::{AssistantMessage, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ToolDefinition};
use crate::chat::CompletionGateway;
use crate::config::GatewayConfig;
use crate::error::{ChatbotError, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// TCP connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// HTTP client for an OpenAI-compatible chat completion endpoint
#[derive(Clone)]
pub struct GatewayClient {
    http: HttpClient,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChatbotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            COMPLETIONS_PATH
        )
    }
}

#[async_trait]
impl CompletionGateway for GatewayClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<AssistantMessage> {
        let tools = tools.filter(|t| !t.is_empty());
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools,
            tool_choice: tools.map(|_| "auto"),
        };

        debug!(
            "Requesting completion: {} messages, {} tools",
            messages.len(),
            tools.map_or(0, |t| t.len())
        );

        let response = self
            .http
            .post(self.completions_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to connect to completion endpoint: {}", e);
                ChatbotError::gateway(format!("Connection failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Completion API error: {} - {}", status.as_u16(), body);
            return Err(ChatbotError::gateway(format!(
                "API error: {}",
                status.as_u16()
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Unreadable completion response: {}", e);
            ChatbotError::gateway(format!("Invalid response: {}", e))
        })?;

        if let Some(err) = completion.error {
            let message = error_message(&err);
            error!("Completion endpoint returned error: {}", message);
            return Err(ChatbotError::gateway(message));
        }

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ChatbotError::gateway("Invalid response: no choices returned"))
    }
}

fn error_message(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
        other => other.to_string(),
    }
}
