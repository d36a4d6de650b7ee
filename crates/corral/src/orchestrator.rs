// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry (§4.7): tracks every live [`Session`], keyed by the
//! `(project, worktree)` pair that identifies it. Sessions are created
//! lazily on first attach and kept running until explicitly destroyed or
//! swept by [`Orchestrator::destroy_all`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::bus::{EventBus, Subscription};
use crate::driver::{build_detector, AgentState, DetectorTag};
use crate::error::{ErrorCode, SupervisorError};
use crate::event::SessionId;
use crate::hooks::HookTable;
use crate::pty::preset::CommandPreset;
use crate::session::{DestroyReason, Session, SessionSettings, WorktreeGitContext};

/// Key a session is registered under: one PTY per worktree per project.
type SessionKey = (String, String);

/// Serializable snapshot of one session for status queries (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub project: String,
    pub worktree: String,
    pub state: AgentState,
    pub is_attached: bool,
    pub has_background_task: bool,
}

/// Session registry — tracks all sessions the supervisor knows about.
///
/// Every session shares the orchestrator's single [`EventBus`], so
/// subscribing once here fans out events from every session (§4.9) without
/// the orchestrator needing to multiplex them itself.
pub struct Orchestrator {
    sessions: RwLock<HashMap<SessionKey, std::sync::Arc<Session>>>,
    bus: EventBus,
    preset: CommandPreset,
    settings: SessionSettings,
    hooks: HookTable,
    detector_tag: DetectorTag,
    worktree_root: PathBuf,
    cols: u16,
    rows: u16,
}

impl Orchestrator {
    pub fn new(
        preset: CommandPreset,
        settings: SessionSettings,
        hooks: HookTable,
        worktree_root: impl Into<PathBuf>,
        cols: u16,
        rows: u16,
    ) -> Self {
        let detector_tag = preset.detector;
        Self {
            sessions: RwLock::new(HashMap::new()),
            bus: EventBus::new(),
            preset,
            settings,
            hooks,
            detector_tag,
            worktree_root: worktree_root.into(),
            cols,
            rows,
        }
    }

    /// Subscribe to the orchestrator-wide event stream (§4.9).
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Resolve a worktree argument against the configured root (§6):
    /// absolute arguments pass through unchanged, relative ones are joined
    /// to `worktree_root`.
    fn resolve_worktree(&self, worktree: &str) -> PathBuf {
        let path = Path::new(worktree);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.worktree_root.join(path)
        }
    }

    /// Attach to the session for `(project, worktree)`, creating it on
    /// first attach (§4.7). The write lock spans session creation so two
    /// concurrent attach calls for the same key can never spawn two PTYs.
    pub async fn attach(
        &self,
        project: &str,
        worktree: &str,
        git_context: WorktreeGitContext,
    ) -> Result<std::sync::Arc<Session>, SupervisorError> {
        let key: SessionKey = (project.to_string(), worktree.to_string());

        if let Some(session) = self.sessions.read().await.get(&key) {
            if !session.is_destroyed() {
                session.attach(self.cols, self.rows).await;
                return Ok(session.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&key) {
            if !session.is_destroyed() {
                session.attach(self.cols, self.rows).await;
                return Ok(session.clone());
            }
            // Self-destructed on early exit with no fallback (§3 Lifecycle
            // (a)); the worktree gets a fresh session instead of being stuck
            // on a dead one (§4.7 lazy-create contract).
            sessions.remove(&key);
        }

        let resolved = self.resolve_worktree(worktree);
        let session = Session::spawn(
            Uuid::new_v4(),
            project.to_string(),
            resolved.to_string_lossy().into_owned(),
            self.preset.clone(),
            self.settings.clone(),
            build_detector(self.detector_tag),
            self.hooks.clone(),
            git_context,
            self.bus.clone(),
            self.cols,
            self.rows,
        )
        .await
        .map_err(|err| SupervisorError::new(ErrorCode::SpawnFailed, err.to_string()))?;

        session.attach(self.cols, self.rows).await;
        sessions.insert(key, session.clone());
        info!(project, worktree, "session created");
        Ok(session)
    }

    fn not_found(project: &str, worktree: &str) -> SupervisorError {
        SupervisorError::new(ErrorCode::NotFound, format!("no session for {project}/{worktree}"))
    }

    /// Look up a session for an operator-facing mutation. Distinguishes
    /// "never existed" from "existed but has since self-destructed" so
    /// `detach`/`send_input`/`resize` report `ErrorCode::Exited` rather than
    /// a generic not-found, pruning the dead entry along the way.
    async fn get_live(&self, project: &str, worktree: &str) -> Result<std::sync::Arc<Session>, SupervisorError> {
        let key: SessionKey = (project.to_string(), worktree.to_string());
        match self.sessions.read().await.get(&key).cloned() {
            Some(session) if !session.is_destroyed() => Ok(session),
            Some(_) => {
                self.sessions.write().await.remove(&key);
                Err(SupervisorError::new(ErrorCode::Exited, format!("session for {project}/{worktree} has exited")))
            }
            None => Err(Self::not_found(project, worktree)),
        }
    }

    /// Mark a session inactive without destroying it (§4.6 `detach`).
    pub async fn detach(&self, project: &str, worktree: &str) -> Result<(), SupervisorError> {
        let session = self.get_live(project, worktree).await?;
        session.detach();
        Ok(())
    }

    pub async fn send_input(&self, project: &str, worktree: &str, bytes: Bytes) -> Result<bool, SupervisorError> {
        let session = self.get_live(project, worktree).await?;
        Ok(session.send_input(bytes).await)
    }

    pub async fn resize(&self, project: &str, worktree: &str, cols: u16, rows: u16) -> Result<(), SupervisorError> {
        let session = self.get_live(project, worktree).await?;
        session.resize(cols, rows).await;
        Ok(())
    }

    /// Terminate and deregister one session (§3 Lifecycle, operator request).
    pub async fn destroy(&self, project: &str, worktree: &str) -> bool {
        let session = self.sessions.write().await.remove(&(project.to_string(), worktree.to_string()));
        match session {
            Some(session) => {
                session.terminate(DestroyReason::OperatorRequested).await;
                true
            }
            None => false,
        }
    }

    /// Snapshot of every registered session (§4.7). Self-destructed sessions
    /// are excluded even before the next touch prunes their map entry.
    pub async fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| !session.is_destroyed())
            .map(|session| SessionSummary {
                id: session.id,
                project: session.project.clone(),
                worktree: session.worktree.clone(),
                state: session.current_state(),
                is_attached: session.is_attached(),
                has_background_task: session.has_background_task(),
            })
            .collect()
    }

    /// Session counts grouped by confirmed state (§4.7 aggregated queries).
    pub async fn counts_by_state(&self) -> HashMap<AgentState, usize> {
        let sessions = self.sessions.read().await;
        let mut counts = HashMap::new();
        for session in sessions.values().filter(|session| !session.is_destroyed()) {
            *counts.entry(session.current_state()).or_insert(0) += 1;
        }
        counts
    }

    /// Session counts grouped by project (§4.7 aggregated queries).
    pub async fn counts_by_project(&self) -> HashMap<String, usize> {
        let sessions = self.sessions.read().await;
        let mut counts = HashMap::new();
        for session in sessions.values().filter(|session| !session.is_destroyed()) {
            *counts.entry(session.project.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Best-effort shutdown sweep (§4.7): every registered session is
    /// terminated even if an earlier one in the sweep panics inside its own
    /// task, since each `terminate` call is independent of the others.
    pub async fn destroy_all(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().map(|(_, session)| session).collect();
        info!(count = sessions.len(), "destroying all sessions");
        for session in sessions {
            let (project, worktree) = (session.project.clone(), session.worktree.clone());
            session.terminate(DestroyReason::OrchestratorShutdown).await;
            info!(project, worktree, "session destroyed during shutdown sweep");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.values().filter(|session| !session.is_destroyed()).count()
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
