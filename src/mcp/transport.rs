//! Line-oriented stdio transport to a tool-server child process.
//!
//! The transport owns the child and its three pipes. Stdout is only read on
//! demand by [`Transport::read_line`]; stderr is drained by a background task
//! so a chatty server can never block on a full pipe.

use crate::error::{ChatbotError, Result};
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Number of stderr lines kept for diagnostics
const STDERR_TAIL_LINES: usize = 20;

/// How long `stop` lets the server exit on its own after stdin closes
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// How long `stop` waits for the stderr drain to see end-of-stream
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(500);

pub struct Transport {
    command: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    // Partial line carried across a timed-out read
    line_buf: Vec<u8>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_task: Option<JoinHandle<()>>,
    stopped: bool,
}

impl Transport {
    /// Spawn the tool server with all three standard streams piped
    pub fn start(argv: &[String]) -> Result<Self> {
        let command = argv.join(" ");
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ChatbotError::spawn("", "empty command"))?;

        info!("Starting MCP server: {}", command);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ChatbotError::spawn(command.clone(), e))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(ChatbotError::spawn(
                command,
                "child process stdio was not captured",
            ));
        };

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let stderr_task = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&stderr_tail);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "mcp_server_stderr", "{}", line);
                    if let Ok(mut tail) = tail.lock() {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            })
        });

        Ok(Self {
            command,
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            line_buf: Vec::new(),
            stderr_tail,
            stderr_task,
            stopped: false,
        })
    }

    /// Write `text` followed by a single newline to the child's stdin
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        if let Ok(Some(status)) = self.child.try_wait() {
            return Err(ChatbotError::PipeClosed(format!(
                "server exited with {}",
                status
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ChatbotError::PipeClosed("transport stopped".to_string()))?;

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(pipe_error)?;
        stdin.flush().await.map_err(pipe_error)?;
        Ok(())
    }

    /// Wait up to `deadline` for the next non-blank line on stdout
    pub async fn read_line(&mut self, deadline: Duration) -> Result<String> {
        if self.stopped {
            return Err(ChatbotError::PipeClosed("transport stopped".to_string()));
        }

        tokio::time::timeout(
            deadline,
            next_line(&mut self.stdout, &mut self.line_buf),
        )
        .await
        .map_err(|_| ChatbotError::timeout("a line from the MCP server", deadline))?
    }

    /// Most recent stderr lines, oldest first
    pub fn stderr_tail(&self) -> Vec<String> {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Terminate the child and wait for it to exit. Safe to call repeatedly.
    pub async fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        info!("Stopping MCP server: {}", self.command);

        // EOF on stdin is the shutdown request for stdio servers
        self.stdin.take();

        let status = match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    "MCP server '{}' did not exit within {:?}, killing it",
                    self.command, SHUTDOWN_TIMEOUT
                );
                if let Err(e) = self.child.start_kill() {
                    debug!("Kill signal not delivered to '{}': {}", self.command, e);
                }
                self.child.wait().await?
            }
        };
        debug!("MCP server '{}' exited with {}", self.command, status);

        if let Some(task) = self.stderr_task.take() {
            if tokio::time::timeout(STDERR_DRAIN_GRACE, task).await.is_err() {
                warn!("stderr drain for '{}' did not finish", self.command);
            }
        }

        info!("MCP server stopped");
        Ok(())
    }
}

async fn next_line(stdout: &mut BufReader<ChildStdout>, line_buf: &mut Vec<u8>) -> Result<String> {
    loop {
        let n = stdout.read_until(b'\n', line_buf).await?;
        if n == 0 {
            return Err(ChatbotError::PipeClosed(
                "server stdout closed (process may have exited)".to_string(),
            ));
        }
        if line_buf.last() != Some(&b'\n') {
            // EOF in the middle of a line
            continue;
        }

        let line = String::from_utf8_lossy(&line_buf[..]).trim().to_string();
        line_buf.clear();
        if !line.is_empty() {
            return Ok(line);
        }
    }
}

fn pipe_error(err: std::io::Error) -> ChatbotError {
    match err.kind() {
        std::io::ErrorKind::BrokenPipe => ChatbotError::PipeClosed(err.to_string()),
        _ => ChatbotError::Io(err),
    }
}
