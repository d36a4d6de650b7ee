// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command Preset (§3): the immutable descriptor a session is created from.

use serde::{Deserialize, Serialize};

use crate::driver::DetectorTag;

/// The ultimate fallback executable for devcontainer-wrapped sessions, used
/// when a preset defines no fallback argument vector of its own (§4.5).
pub const ULTIMATE_FALLBACK_EXECUTABLE: &str = "claude";

/// Immutable descriptor selected at session creation (§3). Never mutated
/// after a session exists (§6 configuration inputs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPreset {
    pub id: String,
    pub display_name: String,
    pub command: String,
    pub args: Vec<String>,
    pub fallback_args: Option<Vec<String>>,
    pub detector: DetectorTag,
    /// When set, every spawn is wrapped as `prefix ++ [inner command...]`
    /// (e.g. `devcontainer exec --workspace-folder . --`).
    pub devcontainer_exec_prefix: Option<Vec<String>>,
}

impl CommandPreset {
    /// Build the argv for the primary spawn: the configured command and
    /// args, wrapped by the devcontainer exec prefix if one is set.
    pub fn primary_argv(&self) -> Vec<String> {
        self.wrap(&self.command, &self.args)
    }

    /// Build the argv for the fallback spawn on early exit (§4.5 step 1):
    /// the fallback args if configured, otherwise an empty argument vector.
    /// Devcontainer-wrapped sessions fall back to the same inner command
    /// (still wrapped by the exec prefix); if the preset names no fallback
    /// at all and is not already `claude`, [`ULTIMATE_FALLBACK_EXECUTABLE`]
    /// is used as the inner command instead.
    pub fn fallback_argv(&self) -> Vec<String> {
        match &self.fallback_args {
            Some(args) => self.wrap(&self.command, args),
            None if self.devcontainer_exec_prefix.is_some() && self.command != ULTIMATE_FALLBACK_EXECUTABLE => {
                self.wrap(ULTIMATE_FALLBACK_EXECUTABLE, &[])
            }
            None => self.wrap(&self.command, &[]),
        }
    }

    fn wrap(&self, command: &str, args: &[String]) -> Vec<String> {
        let mut argv = self.devcontainer_exec_prefix.clone().unwrap_or_default();
        argv.push(command.to_string());
        argv.extend(args.iter().cloned());
        argv
    }
}

#[cfg(test)]
#[path = "preset_tests.rs"]
mod tests;
