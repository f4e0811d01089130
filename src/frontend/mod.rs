//! Process-level wiring: start the tool server, build the session, hand it to
//! the selected front end, and stop the server on every exit path.

pub mod batch;
pub mod interactive;

use crate::chat::ChatSession;
use crate::config::{AppConfig, RunMode};
use crate::error::Result;
use crate::gateway::GatewayClient;
use crate::mcp::{McpClient, ToolDescriptor};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{error, info, info_span, warn, Instrument};

pub type McpChatSession = ChatSession<GatewayClient, McpClient>;

/// Spawn and initialize the tool server, list its tools, and build a session.
///
/// The server is stopped before returning an error, so a failed start never
/// leaves a child process behind.
pub async fn start_session(config: &AppConfig) -> Result<McpChatSession> {
    let span = info_span!("session", mode = %config.mode);

    let (client, tools) = start_tool_server(config).instrument(span.clone()).await?;
    let gateway = GatewayClient::new(config.gateway.clone());

    match gateway {
        Ok(gateway) => Ok(ChatSession::new(gateway, client, tools, span)),
        Err(e) => {
            let mut client = client;
            if let Err(close_err) = client.close().await {
                warn!("Failed to stop MCP server: {}", close_err);
            }
            Err(e)
        }
    }
}

async fn start_tool_server(config: &AppConfig) -> Result<(McpClient, Vec<ToolDescriptor>)> {
    let mut client = McpClient::start(&config.mcp)?;

    if let Err(e) = client.initialize().await {
        error!("Failed to initialize MCP server: {}", e);
        log_stderr_tail(&client);
        if let Err(close_err) = client.close().await {
            warn!("Failed to stop MCP server: {}", close_err);
        }
        return Err(e);
    }

    let tools = client.list_tools().await;
    if tools.is_empty() {
        warn!("MCP server reported no tools");
        log_stderr_tail(&client);
    } else {
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        info!("Available tools: {}", names.join(", "));
    }

    Ok((client, tools))
}

/// Resolves on the first Ctrl+C. If the handler cannot be installed, never resolves.
pub async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C signal, shutting down..."),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Run a full session over the process's stdin and stdout
pub async fn run(config: &AppConfig) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_with_io(config, stdin, tokio::io::stdout()).await
}

/// Run a full session over arbitrary streams, ending early on Ctrl+C
pub async fn run_with_io<R, W>(config: &AppConfig, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    run_until(config, input, output, interrupted()).await
}

/// Run a full session until the front end finishes or `interrupt` resolves.
///
/// The tool server is stopped exactly once, after the loop ends for any reason.
pub async fn run_until<R, W, I>(config: &AppConfig, input: R, output: W, interrupt: I) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future<Output = ()>,
{
    let mut session = start_session(config).await?;

    let result = match config.mode {
        RunMode::Interactive => {
            interactive::run(
                &mut session,
                config.gateway.base_url.as_str(),
                input,
                output,
                interrupt,
            )
            .await
        }
        RunMode::Batch => batch::run(&mut session, input, output, interrupt).await,
    };

    let closed = session.close().await;
    if let Err(e) = &result {
        error!("Session ended with error: {}", e);
    }
    result.and(closed)
}

fn log_stderr_tail(client: &McpClient) {
    let tail = client.stderr_tail();
    if tail.is_empty() {
        return;
    }
    warn!("Last {} lines of MCP server stderr:", tail.len());
    for line in tail {
        warn!("  {}", line);
    }
}
