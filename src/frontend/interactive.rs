use crate::chat::{ChatSession, CompletionGateway, ToolBackend};
use crate::error::Result;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "bye"];

fn is_exit_command(input: &str) -> bool {
    EXIT_COMMANDS
        .iter()
        .any(|cmd| input.eq_ignore_ascii_case(cmd))
}

/// Console loop. Ends on an exit command, end of input, or when `interrupt`
/// resolves, including in the middle of a turn.
pub async fn run<G, T, R, W, I>(
    session: &mut ChatSession<G, T>,
    gateway_url: &str,
    input: R,
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
    info!("Running in interactive mode");
    tokio::pin!(interrupt);

    let names = session.available_tool_names();
    let tools = if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    };

    let header = format!(
        "MCP Chatbot\n\
         Connected to completion gateway at {}\n\
         Available tools: {}\n\
         Type 'quit', 'exit', or 'bye' to end the conversation\n",
        gateway_url, tools
    );
    output.write_all(header.as_bytes()).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"\nYou: ").await?;
        output.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut interrupt => {
                output.write_all(b"\nInterrupted by user\n").await?;
                break;
            }
        };

        // End of input
        let Some(line) = line else {
            output.write_all(b"\n").await?;
            break;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit_command(text) {
            output.write_all(b"\nGoodbye!\n").await?;
            break;
        }

        let outcome = tokio::select! {
            outcome = session.process_turn(text) => outcome,
            _ = &mut interrupt => {
                info!("Turn interrupted");
                output.write_all(b"\nInterrupted by user\n").await?;
                break;
            }
        };
        let reply = format!("\nAssistant: {}\n", outcome.text);
        output.write_all(reply.as_bytes()).await?;
    }

    output.flush().await?;
    Ok(())
}
