//! Claude CLI adapter.
//!
//! Spawns one `claude` process per session in bidirectional stream-json mode.
//! Prompts and permission decisions go to stdin as JSON lines; stdout frames
//! come back one per line. Tool permission is negotiated over the control
//! channel (`--permission-prompt-tool stdio`), so each `can_use_tool` request
//! blocks the runtime until we answer it.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AgentSession, SessionFactory, SessionOptions};
use crate::errors::SessionError;
use crate::event::ToolResponse;
use crate::permission::PermissionDecision;
use crate::stream::RawEvent;

/// How long `close` waits for the process to exit after stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClaudeSessionFactory {
    claude_cmd: String,
    extra_args: Vec<String>,
}

impl ClaudeSessionFactory {
    pub fn new(claude_cmd: impl Into<String>) -> Self {
        Self {
            claude_cmd: claude_cmd.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Arguments passed to the CLI for a session.
    pub fn build_args(&self, options: &SessionOptions) -> Result<Vec<String>, SessionError> {
        let mut args: Vec<String> = [
            "--print",
            "--input-format",
            "stream-json",
            "--output-format",
            "stream-json",
            "--verbose",
            "--permission-prompt-tool",
            "stdio",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        // Tools outside the allow-list must not exist in the runtime at all:
        // read-only tools never trigger a permission request.
        args.push("--tools".to_string());
        args.push(
            options
                .allowed_tools
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(","),
        );

        if let Some(model) = options.model {
            args.push("--model".to_string());
            args.push(model.to_string());
        }
        if !options.agents.is_empty() {
            args.push("--agents".to_string());
            args.push(serde_json::to_string(&options.agents)?);
        }
        args.extend(self.extra_args.iter().cloned());
        Ok(args)
    }
}

#[async_trait]
impl SessionFactory for ClaudeSessionFactory {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn AgentSession>, SessionError> {
        let args = self.build_args(options)?;
        let cwd: PathBuf = if options.cwd.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            options.cwd.clone()
        };

        let mut child = Command::new(&self.claude_cmd)
            .args(&args)
            .current_dir(&cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                command: self.claude_cmd.clone(),
                source,
            })?;

        info!(
            domain = %options.domain,
            pid = child.id().unwrap_or(0),
            agents = options.agents.len(),
            "Agent session opened"
        );

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Runtime("agent runtime stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Runtime("agent runtime stdout unavailable".into()))?;
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "conductor::runtime", "{}", line);
                }
            })
        });

        let mut session = ClaudeSession::from_io(BufReader::new(stdout), stdin);
        session.child = Some(child);
        session.stderr_task = stderr_task;
        Ok(Box::new(session))
    }
}

type FrameWriter = Box<dyn AsyncWrite + Send + Unpin>;
type FrameReader = Box<dyn AsyncBufRead + Send + Unpin>;

pub struct ClaudeSession {
    /// Absent when the session runs over in-memory pipes.
    child: Option<Child>,
    stdin: Option<FrameWriter>,
    lines: Lines<FrameReader>,
    /// Frames split out of a multi-block message, not yet handed out.
    pending: VecDeque<RawEvent>,
    /// A query was submitted and its result frame has not arrived yet.
    turn_open: bool,
    closed: bool,
    stderr_task: Option<JoinHandle<()>>,
}

impl ClaudeSession {
    /// Speak the stream-json protocol over arbitrary pipes: `reader` carries
    /// runtime frames, `writer` receives ours.
    pub fn from_io(
        reader: impl AsyncBufRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let reader: FrameReader = Box::new(reader);
        Self {
            child: None,
            stdin: Some(Box::new(writer)),
            lines: reader.lines(),
            pending: VecDeque::new(),
            turn_open: false,
            closed: false,
            stderr_task: None,
        }
    }

    async fn write_frame(&mut self, frame: &Value) -> Result<(), SessionError> {
        let stdin = self.stdin.as_mut().ok_or(SessionError::Closed)?;
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(SessionError::Write)?;
        stdin.flush().await.map_err(SessionError::Write)
    }
}

#[async_trait]
impl AgentSession for ClaudeSession {
    async fn query(&mut self, prompt: &str) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let frame = json!({
            "type": "user",
            "message": { "role": "user", "content": prompt },
            "parent_tool_use_id": null,
            "session_id": "default"
        });
        self.write_frame(&frame).await?;
        self.turn_open = true;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<RawEvent>, SessionError> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }
            if !self.turn_open {
                return Ok(None);
            }

            let line = self.lines.next_line().await.map_err(SessionError::Read)?;
            let Some(line) = line else {
                self.turn_open = false;
                let code = self
                    .child
                    .as_mut()
                    .and_then(|child| child.try_wait().ok().flatten())
                    .and_then(|status| status.code());
                return Err(SessionError::Exited(code));
            };
            if line.trim().is_empty() {
                continue;
            }

            let raw = RawEvent::from_line(&line);
            if raw.frame_type() == Some("result") {
                self.turn_open = false;
            }
            self.pending.extend(split_frame(raw));
        }
    }

    async fn respond(&mut self, response: &ToolResponse) -> Result<(), SessionError> {
        let inner = match response.decision {
            PermissionDecision::Approve => json!({
                "behavior": "allow",
                "updatedInput": response.arguments,
            }),
            PermissionDecision::Deny => json!({
                "behavior": "deny",
                "message": response.message.clone().unwrap_or_default(),
            }),
        };
        let frame = json!({
            "type": "control_response",
            "response": {
                "subtype": "success",
                "request_id": response.request_id,
                "response": inner,
            }
        });
        self.write_frame(&frame).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.turn_open = false;
        // Dropping stdin signals end of input.
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        if let Some(child) = self.child.as_mut() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(code = ?status.code(), "Agent runtime exited"),
                Ok(Err(e)) => warn!(error = %e, "Failed to wait for agent runtime"),
                Err(_) => {
                    warn!("Agent runtime did not exit in time, killing it");
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill agent runtime");
                    }
                }
            }
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        info!("Agent session closed");
        Ok(())
    }
}

/// Split an assistant message into one frame per content block.
///
/// `tool_use` blocks are dropped: the runtime asks for permission through a
/// separate control request, which is what the orchestrator acts on.
fn split_frame(raw: RawEvent) -> Vec<RawEvent> {
    let RawEvent::Frame(value) = &raw else {
        return vec![raw];
    };
    if value.get("type").and_then(Value::as_str) != Some("assistant") {
        return vec![raw];
    }
    let Some(blocks) = value.pointer("/message/content").and_then(Value::as_array) else {
        return vec![raw];
    };
    if blocks.len() <= 1
        && !blocks
            .iter()
            .any(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"))
    {
        return vec![raw];
    }

    blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) != Some("tool_use"))
        .map(|block| {
            let mut frame = value.clone();
            if let Some(content) = frame.pointer_mut("/message/content") {
                *content = Value::Array(vec![block.clone()]);
            }
            RawEvent::Frame(frame)
        })
        .collect()
}
