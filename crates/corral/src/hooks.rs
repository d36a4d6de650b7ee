// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook Executor (§4.8): runs user-provided shell commands on confirmed
//! state transitions (and, for the external worktree-creation workflow in
//! §6, on worktree post-creation). Hook processes are fire-and-forget:
//! their output is logged, their exit status is logged, neither affects
//! session state (§7).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use uuid::Uuid;

use crate::driver::AgentState;

/// When a [`HookDefinition`] fires (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookScope {
    StatusTransition,
    WorktreePostCreation,
}

/// Stateless hook descriptor, referenced by the executor at fire time (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDefinition {
    pub command: String,
    pub enabled: bool,
    pub scope: HookScope,
}

/// Lookup table of configured hooks, read-only once built (§6).
#[derive(Debug, Clone, Default)]
pub struct HookTable {
    /// Hooks keyed by the exact (old, new) transition.
    transitions: HashMap<(AgentState, AgentState), Vec<HookDefinition>>,
    /// Hooks that fire on any status transition, regardless of old/new.
    wildcard: Vec<HookDefinition>,
    /// Hooks that fire once a worktree has been created.
    worktree_post_creation: Vec<HookDefinition>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_transition(mut self, old: AgentState, new: AgentState, hook: HookDefinition) -> Self {
        self.transitions.entry((old, new)).or_default().push(hook);
        self
    }

    pub fn on_any_transition(mut self, hook: HookDefinition) -> Self {
        self.wildcard.push(hook);
        self
    }

    pub fn on_worktree_post_creation(mut self, hook: HookDefinition) -> Self {
        self.worktree_post_creation.push(hook);
        self
    }

    /// Enabled hooks applicable to a confirmed `old -> new` transition: the
    /// exact match plus the wildcard "any transition" hooks (§4.8).
    fn hooks_for_transition(&self, old: AgentState, new: AgentState) -> Vec<HookDefinition> {
        self.transitions
            .get(&(old, new))
            .into_iter()
            .flatten()
            .chain(self.wildcard.iter())
            .filter(|h| h.enabled)
            .cloned()
            .collect()
    }
}

/// Everything a status-transition hook's environment needs (§6, §4.8).
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub session_id: Uuid,
    pub old_state: AgentState,
    pub new_state: AgentState,
    pub worktree_path: String,
    pub worktree_branch: String,
    pub git_root: String,
    pub base_branch: Option<String>,
    pub extra_env: HashMap<String, String>,
}

/// Everything a worktree-post-creation hook's environment needs (§6).
#[derive(Debug, Clone)]
pub struct WorktreeContext {
    pub worktree_path: String,
    pub worktree_branch: String,
    pub git_root: String,
    pub base_branch: Option<String>,
    pub extra_env: HashMap<String, String>,
}

fn state_name(state: AgentState) -> &'static str {
    match state {
        AgentState::Idle => "idle",
        AgentState::Busy => "busy",
        AgentState::WaitingInput => "waiting_input",
        AgentState::PendingAutoApproval => "pending_auto_approval",
    }
}

fn shared_env(worktree_path: &str, worktree_branch: &str, git_root: &str, base_branch: &Option<String>) -> Vec<(String, String)> {
    let mut env = vec![
        ("CCMANAGER_WORKTREE_PATH".to_string(), worktree_path.to_string()),
        ("CCMANAGER_WORKTREE_BRANCH".to_string(), worktree_branch.to_string()),
        ("CCMANAGER_GIT_ROOT".to_string(), git_root.to_string()),
    ];
    if let Some(base) = base_branch {
        env.push(("CCMANAGER_BASE_BRANCH".to_string(), base.clone()));
    }
    env
}

/// Fires configured hooks for a confirmed state transition. Each hook is
/// spawned on its own detached task; this function does not await hook
/// completion (§4.8 fire-and-forget).
pub fn fire_transition_hooks(table: &HookTable, ctx: TransitionContext) {
    for hook in table.hooks_for_transition(ctx.old_state, ctx.new_state) {
        let mut env = shared_env(&ctx.worktree_path, &ctx.worktree_branch, &ctx.git_root, &ctx.base_branch);
        env.push(("CCMANAGER_SESSION_ID".to_string(), ctx.session_id.to_string()));
        env.push(("CCMANAGER_OLD_STATE".to_string(), state_name(ctx.old_state).to_string()));
        env.push(("CCMANAGER_NEW_STATE".to_string(), state_name(ctx.new_state).to_string()));
        env.extend(ctx.extra_env.clone());
        spawn_hook(hook.command, env);
    }
}

/// Fires configured hooks after a worktree has been created. Worktree
/// creation itself is an external collaborator (§1); this function only
/// owns hook dispatch.
pub fn fire_worktree_post_creation_hooks(table: &HookTable, ctx: WorktreeContext) {
    for hook in table.worktree_post_creation.iter().filter(|h| h.enabled) {
        let mut env = shared_env(&ctx.worktree_path, &ctx.worktree_branch, &ctx.git_root, &ctx.base_branch);
        env.extend(ctx.extra_env.clone());
        spawn_hook(hook.command.clone(), env);
    }
}

fn spawn_hook(command: String, env: Vec<(String, String)>) {
    tokio::spawn(async move {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&command).envs(env);

        match cmd.output().await {
            Ok(output) => {
                if !output.stdout.is_empty() {
                    tracing::debug!(%command, stdout = %String::from_utf8_lossy(&output.stdout), "hook stdout");
                }
                if !output.stderr.is_empty() {
                    tracing::debug!(%command, stderr = %String::from_utf8_lossy(&output.stderr), "hook stderr");
                }
                if !output.status.success() {
                    tracing::warn!(%command, status = %output.status, "hook exited non-zero");
                }
            }
            Err(err) => {
                tracing::warn!(%command, error = %err, "hook failed to spawn");
            }
        }
    });
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
