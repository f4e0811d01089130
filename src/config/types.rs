use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the session talks to its caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Interactive,
    #[serde(alias = "stdio")]
    Batch,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Interactive => write!(f, "interactive"),
            RunMode::Batch => write!(f, "batch"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpConfig {
    /// Shell-style command line launching the tool server
    #[serde(default)]
    pub command: String,
    #[serde(default = "default_mcp_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_client_version")]
    pub client_version: String,
}

impl McpConfig {
    /// Split the command line into program and arguments, honouring quotes
    pub fn command_argv(&self) -> crate::Result<Vec<String>> {
        let argv = shell_words::split(&self.command).map_err(|e| {
            crate::ChatbotError::Config(format!("Invalid MCP command '{}': {}", self.command, e))
        })?;
        if argv.is_empty() {
            return Err(crate::ChatbotError::Config(
                "MCP command is empty".to_string(),
            ));
        }
        Ok(argv)
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            request_timeout_secs: default_mcp_timeout(),
            protocol_version: default_protocol_version(),
            client_name: default_client_name(),
            client_version: default_client_version(),
        }
    }
}

fn default_mcp_timeout() -> u64 {
    10
}

fn default_protocol_version() -> String {
    "2024-11-05".to_string()
}

fn default_client_name() -> String {
    "mcp-chatbot".to_string()
}

fn default_client_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_gateway_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_gateway_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:1234".to_string()
}

fn default_model() -> String {
    "local-model".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_gateway_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_argv_honours_quotes() {
        let config = McpConfig {
            command: r#"java -jar "my server.jar" --port 0"#.to_string(),
            ..Default::default()
        };

        let argv = config.command_argv().unwrap();
        assert_eq!(argv, vec!["java", "-jar", "my server.jar", "--port", "0"]);
    }

    #[test]
    fn test_command_argv_rejects_empty() {
        let config = McpConfig::default();
        assert!(config.command_argv().is_err());

        let config = McpConfig {
            command: "   ".to_string(),
            ..Default::default()
        };
        assert!(config.command_argv().is_err());
    }

    #[test]
    fn test_command_argv_rejects_unbalanced_quotes() {
        let config = McpConfig {
            command: r#"node "server.js"#.to_string(),
            ..Default::default()
        };
        assert!(config.command_argv().is_err());
    }

    #[test]
    fn test_run_mode_accepts_stdio_alias() {
        let mode: RunMode = serde_json::from_str(r#""stdio""#).unwrap();
        assert_eq!(mode, RunMode::Batch);
        let mode: RunMode = serde_json::from_str(r#""interactive""#).unwrap();
        assert_eq!(mode, RunMode::Interactive);
        assert_eq!(RunMode::Batch.to_string(), "batch");
    }
}
