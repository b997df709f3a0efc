//! Bounded external tool invocation

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Longest stderr excerpt carried into a failure message.
pub const MESSAGE_LIMIT: usize = 100;

#[derive(Debug)]
pub(crate) enum ToolError {
    /// The binary could not be started at all
    Spawn(std::io::Error),
    /// Still running when the limit expired; the child has been killed
    Timeout(Duration),
    /// Exited unsuccessfully
    Failed { code: Option<i32>, stderr: String },
}

impl ToolError {
    /// Short human-readable reason for non-timeout failures.
    pub(crate) fn reason(&self) -> String {
        match self {
            ToolError::Spawn(e) => truncate(&format!("could not start: {e}"), MESSAGE_LIMIT),
            ToolError::Timeout(limit) => format!("timed out after {}s", limit.as_secs_f64()),
            ToolError::Failed { code, stderr } if stderr.trim().is_empty() => {
                format!("exit code {code:?}")
            }
            ToolError::Failed { stderr, .. } => truncate(stderr.trim(), MESSAGE_LIMIT),
        }
    }
}

/// Run a command to completion, capturing its output, within `limit`.
///
/// The child is killed when the limit expires.
pub(crate) async fn run_bounded(command: &mut Command, limit: Duration) -> Result<Output, ToolError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {:?}", command.as_std());

    let output = timeout(limit, command.output())
        .await
        .map_err(|_| ToolError::Timeout(limit))?
        .map_err(ToolError::Spawn)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!("Tool stderr: {}", stderr.trim());
        return Err(ToolError::Failed {
            code: output.status.code(),
            stderr,
        });
    }

    Ok(output)
}

/// Cut `s` to at most `max_chars` characters.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}
