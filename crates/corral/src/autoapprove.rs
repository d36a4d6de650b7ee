// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-Approval Pipeline (§4.4): invokes an external policy oracle against
//! a screen snapshot and reports whether the current prompt needs a human.
//!
//! The pipeline itself does not touch session state — [`run_policy_oracle`]
//! is a standalone cancellable async call. The session wires its result into
//! state transitions (force `busy` on allow, force `waiting_input` plus
//! `auto_approval_blocked` on block) because only the session knows the
//! debounce engine and the PTY write handle.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Default auto-approval verification timeout (§4.4, §5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed safety prompt sent alongside the screen snapshot (§4.4 step 3).
pub const SAFETY_PROMPT: &str = concat!(
    "You are a safety check for an unattended coding agent. Given the ",
    "agent's current terminal output, decide whether the prompt it is ",
    "showing requires a human to review before approving. Prefer ",
    "requiring permission when in doubt, especially for destructive or ",
    "irreversible operations. Respond with the required JSON only.",
);

/// JSON schema advertised to the default oracle invocation (§6).
pub const RESPONSE_SCHEMA: &str =
    r#"{"type":"object","properties":{"needsPermission":{"type":"boolean"},"reason":{"type":"string"}},"required":["needsPermission"]}"#;

/// How the policy oracle subprocess is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleCommand {
    /// `claude --model haiku -p --output-format json --json-schema <SCHEMA>`
    /// with the prompt delivered on stdin (§6).
    Default,
    /// An operator-supplied shell command, invoked with `DEFAULT_PROMPT` and
    /// `TERMINAL_OUTPUT` set in its environment (§6).
    Custom(String),
}

impl Default for OracleCommand {
    fn default() -> Self {
        Self::Default
    }
}

/// Read-only configuration for the pipeline, fixed at session creation
/// (§6 configuration inputs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOracleConfig {
    pub command: OracleCommand,
    pub timeout: Duration,
}

impl Default for PolicyOracleConfig {
    fn default() -> Self {
        Self { command: OracleCommand::default(), timeout: DEFAULT_TIMEOUT }
    }
}

/// Parsed (or synthesized-on-failure) oracle result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleOutcome {
    pub needs_permission: bool,
    pub reason: Option<String>,
}

impl OracleOutcome {
    fn blocked(reason: impl Into<String>) -> Self {
        Self { needs_permission: true, reason: Some(reason.into()) }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(rename = "needsPermission")]
    needs_permission: bool,
    reason: Option<String>,
}

/// Run the policy oracle against `snapshot` (the last 300 visible lines,
/// plain text). On timeout, cancellation, or any execution/parse failure,
/// the outcome defaults to `needs_permission = true` with a diagnostic
/// reason (§4.4 step 3, §7).
///
/// `cancel` is expected to be a fresh, session-owned token installed before
/// this call (§4.4 step 1); the caller is responsible for discarding the
/// result if the session has since left `pending_auto_approval` (step 4) —
/// this function only honors cancellation requested *during* the call.
pub async fn run_policy_oracle(
    config: &PolicyOracleConfig,
    snapshot: &str,
    cancel: &CancellationToken,
) -> OracleOutcome {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => OracleOutcome::blocked("auto-approval verification cancelled"),
        result = tokio::time::timeout(config.timeout, invoke(config, snapshot, cancel)) => {
            match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => OracleOutcome::blocked(format!("policy oracle failed: {err}")),
                Err(_) => OracleOutcome::blocked("policy oracle timed out"),
            }
        }
    }
}

async fn invoke(
    config: &PolicyOracleConfig,
    snapshot: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<OracleOutcome> {
    let mut command = build_command(&config.command, snapshot);
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn policy oracle")?;

    if matches!(config.command, OracleCommand::Default) {
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = format!("{SAFETY_PROMPT}\n\n{snapshot}");
            stdin.write_all(prompt.as_bytes()).await.context("write oracle prompt")?;
        }
    }
    let mut stdout = child.stdout.take();

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            let _ = child.start_kill();
            anyhow::bail!("cancelled while awaiting policy oracle");
        }
        status = child.wait() => status.context("wait for policy oracle")?,
    };

    if !status.success() {
        anyhow::bail!("policy oracle exited with {status}");
    }

    let mut buf = Vec::new();
    if let Some(mut stdout) = stdout.take() {
        stdout.read_to_end(&mut buf).await.context("read policy oracle stdout")?;
    }
    parse_response(&buf)
}

fn build_command(command: &OracleCommand, snapshot: &str) -> Command {
    match command {
        OracleCommand::Default => {
            let mut cmd = Command::new("claude");
            cmd.args([
                "--model",
                "haiku",
                "-p",
                "--output-format",
                "json",
                "--json-schema",
                RESPONSE_SCHEMA,
            ]);
            cmd
        }
        OracleCommand::Custom(shell_command) => {
            let mut cmd = Command::new("sh");
            cmd.arg("-c")
                .arg(shell_command)
                .env("DEFAULT_PROMPT", SAFETY_PROMPT)
                .env("TERMINAL_OUTPUT", snapshot);
            cmd
        }
    }
}

fn parse_response(bytes: &[u8]) -> anyhow::Result<OracleOutcome> {
    let raw: RawResponse = serde_json::from_slice(bytes).context("parse policy oracle response")?;
    Ok(OracleOutcome { needs_permission: raw.needs_permission, reason: raw.reason })
}

#[cfg(test)]
#[path = "autoapprove_tests.rs"]
mod tests;
