use anyhow::{Context, Result};
use clap::Parser;
use mcp_chatbot::config::{self, ConfigOverrides};
use mcp_chatbot::frontend;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mcp-chatbot")]
#[command(about = "Chat with a local LLM that can call MCP tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Command that launches the MCP tool server, e.g. "java -jar server.jar"
    #[arg(long, env = "MCP_COMMAND")]
    mcp_command: Option<String>,

    /// Base URL of the OpenAI-compatible completion endpoint
    #[arg(long, alias = "lm-studio-url", env = "GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Run mode: interactive (console) or batch (one JSON reply per input line)
    #[arg(long)]
    mode: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "mcp-chatbot.toml")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Override log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be up yet if configuration failed
            eprintln!("Error: {:#}", e);
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        mcp_command: cli.mcp_command,
        gateway_url: cli.gateway_url,
        mode: cli.mode,
        log_level: cli.log_level,
        log_format: cli.log_format,
    };
    let config = config::load_config(&cli.config, &overrides).with_context(|| {
        format!(
            "Failed to load configuration from: {}",
            cli.config.display()
        )
    })?;

    init_logging(&config.logging)?;
    print_banner(&config);

    info!("Starting MCP Chatbot...");
    frontend::run(&config).await?;

    Ok(())
}

fn init_logging(config: &config::LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // stdout belongs to the chat replies
    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

fn print_banner(config: &config::AppConfig) {
    let version = env!("CARGO_PKG_VERSION");
    let width = 59usize;
    let border = "═".repeat(width + 2);
    let line = |content: &str| {
        info!("║ {:width$} ║", content, width = width);
    };

    info!("╔{}╗", border);
    line("MCP-CHATBOT");
    line(&format!("Local LLM + MCP tools v{}", version));
    info!("╚{}╝", border);
    info!("Session Configuration:");
    info!("  → MCP Server: {}", config.mcp.command);
    info!("  → Gateway: {}", config.gateway.base_url);
    info!("  → Model: {}", config.gateway.model);
    info!("  → Mode: {}", config.mode);
    info!("  → Log Level: {}", config.logging.level);
}
