//! Helper process execution and output classification.
//!
//! One call runs one process to completion. The caller's [`ExecContext`]
//! bounds it: on cancellation or deadline the child is killed and the call
//! returns `Cancelled`/`TimedOut`. Whatever the helper already committed to
//! the store stays committed.
//!
//! Captured stdout is classified in this order:
//!
//! 1. a `{"error": "..."}` payload becomes [`MapError::Store`]
//! 2. a non-zero exit becomes [`MapError::Execution`]
//! 3. well-formed JSON becomes [`ToolOutput::Structured`]
//! 4. anything else becomes [`ToolOutput::Raw`]

use std::process::Stdio;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::error::{MapError, MapResult};
use crate::output::ToolError;

/// Marker that makes the runner try to decode an error payload.
const ERROR_MARKER: &str = "\"error\"";

/// Per-call context: trace correlation, cancellation and deadline.
#[derive(Debug, Clone)]
pub struct ExecContext {
    trace_id: String,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl ExecContext {
    /// Creates a context with no deadline and a fresh cancellation token.
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Kills the helper if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ties the call to an externally owned token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Successful helper output.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Well-formed JSON.
    Structured(Value),
    /// Anything else, including empty output.
    Raw(String),
}

impl ToolOutput {
    /// Decodes structured output into an operation-specific shape.
    pub fn decode<T: DeserializeOwned>(self, command: &str) -> MapResult<T> {
        match self {
            ToolOutput::Structured(value) => serde_json::from_value(value).map_err(|e| {
                MapError::execution(command, format!("unexpected output shape: {}", e))
            }),
            ToolOutput::Raw(text) => Err(MapError::execution(
                command,
                format!("expected JSON output, got '{}'", text),
            )),
        }
    }
}

/// Runs one helper command to completion.
pub async fn run(cmd: &ToolCommand, ctx: &ExecContext) -> MapResult<ToolOutput> {
    let command = cmd.to_string();
    if ctx.cancel.is_cancelled() {
        tracing::warn!(trace_id = %ctx.trace_id, command = %command, "Map helper not started, request cancelled");
        return Err(MapError::Cancelled { command });
    }
    tracing::info!(trace_id = %ctx.trace_id, command = %command, "Executing map helper");

    let child = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MapError::Spawn {
            command: command.clone(),
            source: e,
        })?;

    let deadline = async {
        match ctx.timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    // Dropping the wait future drops the child, which kills it.
    let output = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            tracing::warn!(trace_id = %ctx.trace_id, command = %command, "Map helper cancelled");
            return Err(MapError::Cancelled { command });
        }
        _ = deadline => {
            tracing::warn!(trace_id = %ctx.trace_id, command = %command, "Map helper timed out");
            return Err(MapError::TimedOut {
                command,
                timeout: ctx.timeout.unwrap_or_default(),
            });
        }
        res = child.wait_with_output() => res.map_err(|e| {
            MapError::execution(command.clone(), format!("failed to read output: {}", e))
        })?,
    };

    let exit_code = output.status.code();
    tracing::debug!(
        trace_id = %ctx.trace_id,
        command = %command,
        exit_code = ?exit_code,
        stdout_bytes = output.stdout.len(),
        "Map helper finished"
    );

    let result = classify(
        &command,
        output.status.success(),
        exit_code,
        &output.stdout,
        &output.stderr,
    );
    if let Err(e) = &result {
        tracing::warn!(trace_id = %ctx.trace_id, command = %command, error = %e, "Map helper failed");
    }
    result
}

/// Classifies captured output. Pure, so it can be tested without a process.
pub fn classify(
    command: &str,
    success: bool,
    exit_code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> MapResult<ToolOutput> {
    let text = std::str::from_utf8(stdout)
        .map_err(|_| MapError::execution(command, "output is not valid UTF-8"))?;
    let trimmed = text.trim();

    if trimmed.contains(ERROR_MARKER) {
        if let Ok(payload) = serde_json::from_str::<ToolError>(trimmed) {
            return Err(MapError::store(command, payload.error));
        }
    }

    if !success {
        let detail = String::from_utf8_lossy(stderr).trim().to_string();
        let detail = if detail.is_empty() {
            trimmed.to_string()
        } else {
            detail
        };
        let status = exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(MapError::execution(
            command,
            format!("exit status {}: {}", status, detail),
        ));
    }

    if trimmed.is_empty() {
        return Ok(ToolOutput::Raw(String::new()));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Ok(ToolOutput::Structured(value)),
        Err(_) => Ok(ToolOutput::Raw(trimmed.to_string())),
    }
}
