// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration inputs (§6): read once at session-creation time. Changing
//! these after a session exists does not alter the session (§6).

use std::time::Duration;

use clap::Parser;

use crate::autoapprove::{OracleCommand, PolicyOracleConfig};
use crate::driver::DetectorTag;
use crate::pty::preset::CommandPreset;

/// Terminal supervisor for interactive AI coding agents.
#[derive(Debug, Parser)]
#[command(name = "corral", version, about)]
pub struct Config {
    /// HTTP port the Event API listens on.
    #[arg(long, env = "CORRAL_PORT")]
    pub port: Option<u16>,

    /// Unix socket path for the Event API, as an alternative to --port.
    #[arg(long, env = "CORRAL_SOCKET")]
    pub socket: Option<String>,

    /// Host address to bind to.
    #[arg(long, env = "CORRAL_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Bearer token required on the Event API, if set.
    #[arg(long, env = "CORRAL_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Agent family, selecting the default detector and command
    /// (claude, gemini, codex, cursor, copilot, cline, unknown).
    #[arg(long, env = "CORRAL_AGENT_TYPE", default_value = "claude")]
    pub agent_type: String,

    /// Initial terminal columns, copied from the operator terminal at
    /// attach time if available (§4.5).
    #[arg(long, env = "CORRAL_COLS", default_value = "80")]
    pub cols: u16,

    /// Initial terminal rows.
    #[arg(long, env = "CORRAL_ROWS", default_value = "24")]
    pub rows: u16,

    /// Raw scrollback ring buffer capacity in bytes (§4.1).
    #[arg(long, env = "CORRAL_RING_SIZE", default_value_t = crate::ring::DEFAULT_RING_CAPACITY)]
    pub ring_size: usize,

    /// Number of trailing visible lines read back for classification and
    /// snapshots (§4.1, N in the spec).
    #[arg(long, env = "CORRAL_VISIBLE_LINES", default_value_t = crate::screen::DEFAULT_VISIBLE_LINES)]
    pub visible_lines: usize,

    /// TERM environment variable for the spawned child.
    #[arg(long, env = "TERM", default_value = "xterm-256color")]
    pub term: String,

    /// Debounce persistence window in milliseconds (§4.3).
    #[arg(long, env = "CORRAL_PERSISTENCE_WINDOW_MS", default_value = "1500")]
    pub persistence_window_ms: u64,

    /// Classification tick interval in milliseconds (§4.3).
    #[arg(long, env = "CORRAL_TICK_INTERVAL_MS", default_value = "500")]
    pub tick_interval_ms: u64,

    /// Whether the auto-approval pipeline is globally enabled (§4.3, §4.4).
    #[arg(long, env = "CORRAL_AUTO_APPROVAL_ENABLED")]
    pub auto_approval_enabled: bool,

    /// Auto-approval verification timeout in seconds (§4.4).
    #[arg(long, env = "CORRAL_AUTO_APPROVAL_TIMEOUT_SECS", default_value = "30")]
    pub auto_approval_timeout_secs: u64,

    /// Operator-supplied shell command used as the policy oracle instead of
    /// the default `claude --model haiku` invocation (§6).
    #[arg(long, env = "CORRAL_POLICY_ORACLE_COMMAND")]
    pub policy_oracle_command: Option<String>,

    /// Wrap the spawned command through `devcontainer exec` (§4.5).
    #[arg(long, env = "CORRAL_DEVCONTAINER")]
    pub devcontainer: bool,

    /// `--workspace-folder` argument passed to `devcontainer exec`.
    #[arg(long, env = "CORRAL_DEVCONTAINER_WORKSPACE_FOLDER", default_value = ".")]
    pub devcontainer_workspace_folder: String,

    /// Health-check-only HTTP port.
    #[arg(long, env = "CORRAL_HEALTH_PORT")]
    pub health_port: Option<u16>,

    /// Root directory under which worktrees are discovered. Discovery
    /// itself is an external collaborator (§1); the orchestrator only needs
    /// this to resolve a worktree argument against a base directory.
    #[arg(long, env = "CORRAL_WORKTREE_ROOT", default_value = ".")]
    pub worktree_root: String,

    /// Log format (json or text).
    #[arg(long, env = "CORRAL_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CORRAL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to run (after `--`); overrides the agent type's default
    /// command and argument vector.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Fallback argument vector consulted on early exit (§3, §4.5); only
    /// meaningful alongside an explicit `command`.
    #[arg(long = "fallback-arg", env = "CORRAL_FALLBACK_ARGS", value_delimiter = ',', allow_hyphen_values = true)]
    pub fallback_args: Vec<String>,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.agent_type_enum()?;

        if self.port.is_none() && self.socket.is_none() {
            anyhow::bail!("either --port or --socket must be specified");
        }

        if !self.fallback_args.is_empty() && self.command.is_empty() {
            anyhow::bail!("--fallback-arg requires an explicit command");
        }

        Ok(())
    }

    /// Parse the agent type string into a detector tag.
    pub fn agent_type_enum(&self) -> anyhow::Result<DetectorTag> {
        match self.agent_type.to_lowercase().as_str() {
            "claude" => Ok(DetectorTag::Claude),
            "gemini" => Ok(DetectorTag::Gemini),
            "codex" => Ok(DetectorTag::Codex),
            "cursor" => Ok(DetectorTag::Cursor),
            "copilot" => Ok(DetectorTag::Copilot),
            "cline" => Ok(DetectorTag::Cline),
            "unknown" => Ok(DetectorTag::Unknown),
            other => anyhow::bail!("invalid agent type: {other}"),
        }
    }

    /// Build the command preset this configuration selects (§3). The
    /// explicit `command` vector, when given, overrides the agent type's
    /// built-in default.
    pub fn build_preset(&self) -> anyhow::Result<CommandPreset> {
        let detector = self.agent_type_enum()?;

        let (command, args) = if let Some((command, args)) = self.command.split_first() {
            (command.clone(), args.to_vec())
        } else {
            (default_executable(detector).to_string(), Vec::new())
        };

        let fallback_args = if self.fallback_args.is_empty() { None } else { Some(self.fallback_args.clone()) };

        let devcontainer_exec_prefix = self.devcontainer.then(|| {
            vec![
                "devcontainer".to_string(),
                "exec".to_string(),
                "--workspace-folder".to_string(),
                self.devcontainer_workspace_folder.clone(),
                "--".to_string(),
            ]
        });

        Ok(CommandPreset {
            id: self.agent_type.clone(),
            display_name: self.agent_type.clone(),
            command,
            args,
            fallback_args,
            detector,
            devcontainer_exec_prefix,
        })
    }

    pub fn persistence_window(&self) -> Duration {
        Duration::from_millis(self.persistence_window_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn policy_oracle_config(&self) -> PolicyOracleConfig {
        let command = match &self.policy_oracle_command {
            Some(shell_command) => OracleCommand::Custom(shell_command.clone()),
            None => OracleCommand::Default,
        };
        PolicyOracleConfig { command, timeout: Duration::from_secs(self.auto_approval_timeout_secs) }
    }
}

fn default_executable(detector: DetectorTag) -> &'static str {
    match detector {
        DetectorTag::Claude | DetectorTag::Unknown => "claude",
        DetectorTag::Gemini => "gemini",
        DetectorTag::Codex => "codex",
        DetectorTag::Cursor => "cursor-agent",
        DetectorTag::Copilot => "copilot",
        DetectorTag::Cline => "cline",
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
