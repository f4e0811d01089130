pub mod types;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use std::path::Path;
pub use types::*;

/// Prefix for environment overrides, e.g. `MCP_CHATBOT__GATEWAY__BASE_URL`
pub const ENV_PREFIX: &str = "MCP_CHATBOT";

/// Command-line values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub mcp_command: Option<String>,
    pub gateway_url: Option<String>,
    pub mode: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

/// Load configuration from an optional TOML file, the environment, and CLI overrides
pub fn load_config<P: AsRef<Path>>(path: P, overrides: &ConfigOverrides) -> Result<AppConfig> {
    let path = path.as_ref();

    let config = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("mcp.command", overrides.mcp_command.clone())?
        .set_override_option("gateway.base_url", overrides.gateway_url.clone())?
        .set_override_option("mode", overrides.mode.clone())?
        .set_override_option("logging.level", overrides.log_level.clone())?
        .set_override_option("logging.format", overrides.log_format.clone())?
        .build()
        .with_context(|| format!("Failed to load config from: {}", path.display()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate the merged configuration
fn validate_config(config: &AppConfig) -> Result<()> {
    config
        .mcp
        .command_argv()
        .context("An MCP server command is required (--mcp-command)")?;

    if config.mcp.request_timeout_secs == 0 {
        anyhow::bail!("mcp.request_timeout_secs must be greater than zero");
    }

    let base_url = &config.gateway.base_url;
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        anyhow::bail!(
            "Gateway URL '{}' must start with http:// or https://",
            base_url
        );
    }

    if !(0.0..=2.0).contains(&config.gateway.temperature) {
        anyhow::bail!(
            "gateway.temperature {} is outside 0.0..=2.0",
            config.gateway.temperature
        );
    }

    if config.gateway.max_tokens == 0 {
        anyhow::bail!("gateway.max_tokens must be greater than zero");
    }

    if config.gateway.request_timeout_secs == 0 {
        anyhow::bail!("gateway.request_timeout_secs must be greater than zero");
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        anyhow::bail!(
            "Invalid log level '{}'. Valid levels: {}",
            config.logging.level,
            valid_levels.join(", ")
        );
    }

    let valid_formats = ["pretty", "json"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        anyhow::bail!(
            "Invalid log format '{}'. Valid formats: {}",
            config.logging.format,
            valid_formats.join(", ")
        );
    }

    Ok(())
}
