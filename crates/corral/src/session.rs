// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session (§4.6): owns one PTY child, one virtual terminal, one detector,
//! and the mutex-protected state record (§3, §5) for a single worktree.
//!
//! A [`Session`] is created once per worktree and lives for as long as the
//! orchestrator keeps it registered; it keeps running in the background
//! while detached. Its public surface (`attach`, `detach`, `send_input`,
//! `resize`, `terminate`) is safe to call concurrently — every mutation of
//! the state record goes through [`SessionRecord`]'s mutex, and the PTY
//! read loop, classification tick, and auto-approval verification never
//! hold that mutex across a suspension point (§5).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::autoapprove::{self, OracleOutcome, PolicyOracleConfig};
use crate::bus::EventBus;
use crate::debounce::{Confirmation, TransitionEngine};
use crate::driver::{AgentState, Detector, ExitStatus};
use crate::event::{Event, EventKind, SessionId};
use crate::hooks::{fire_transition_hooks, HookTable, TransitionContext};
use crate::pty::preset::CommandPreset;
use crate::pty::spawn::NativePty;
use crate::pty::{Backend, BackendInput, Boxed};
use crate::ring::RingBuffer;
use crate::screen::Screen;

/// Reserved "return to menu" keystroke (§4.6 `send_input`). Keyboard
/// shortcut configuration lives outside the core (§1); this is only the
/// built-in default the core recognizes when no override is configured.
pub const DEFAULT_RETURN_TO_MENU: &[u8] = &[0x05]; // Ctrl+E

/// Everything read once at session creation and never mutated afterward
/// (§6 "Configuration inputs").
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub persistence_window: Duration,
    pub tick_interval: Duration,
    pub auto_approval_enabled: bool,
    pub policy_oracle: PolicyOracleConfig,
    pub ring_capacity: usize,
    pub visible_lines: usize,
    pub term: String,
    pub return_to_menu: Vec<u8>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            persistence_window: crate::debounce::DEFAULT_PERSISTENCE_WINDOW,
            tick_interval: Duration::from_millis(500),
            auto_approval_enabled: false,
            policy_oracle: PolicyOracleConfig::default(),
            ring_capacity: crate::ring::DEFAULT_RING_CAPACITY,
            visible_lines: crate::screen::DEFAULT_VISIBLE_LINES,
            term: "xterm-256color".to_string(),
            return_to_menu: DEFAULT_RETURN_TO_MENU.to_vec(),
        }
    }
}

/// Git context forwarded into hook environments (§6).
#[derive(Debug, Clone, Default)]
pub struct WorktreeGitContext {
    pub branch: String,
    pub git_root: String,
    pub base_branch: Option<String>,
}

/// Mutex-protected state record (§3, §5). Every mutation is a read-snapshot
/// / compute / atomic-write through this single mutex; nothing here is held
/// across an `.await`.
struct SessionRecord {
    transition: TransitionEngine,
    is_primary_command: bool,
    is_attached: bool,
    auto_approval_blocked: bool,
    auto_approval_reason: Option<String>,
    last_activity: Instant,
}

/// One of the four reasons a session tears down (§3 Lifecycle, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    ExitedNoFallback,
    OrchestratorShutdown,
    OperatorRequested,
}

/// Handle to the currently-running backend task, swapped wholesale on
/// fallback respawn (§4.5 step 2).
struct BackendHandle {
    input_tx: mpsc::Sender<BackendInput>,
    join: JoinHandle<anyhow::Result<ExitStatus>>,
}

/// The run-time triple of (PTY child, virtual terminal, state record) bound
/// to one worktree (§3).
pub struct Session {
    pub id: SessionId,
    pub project: String,
    pub worktree: String,
    preset: CommandPreset,
    settings: SessionSettings,
    detector: Box<dyn Detector>,
    hooks: HookTable,
    git_context: WorktreeGitContext,
    bus: EventBus,
    seq: AtomicU64,
    record: StdMutex<SessionRecord>,
    screen: AsyncMutex<Screen>,
    ring: AsyncMutex<RingBuffer>,
    backend: AsyncMutex<Option<BackendHandle>>,
    /// Present iff a policy-oracle verification is currently in flight
    /// (§3 invariant).
    auto_approval_cancel: StdMutex<Option<CancellationToken>>,
    has_background_task: AtomicBool,
    destroyed: AtomicBool,
    cols: AtomicU16,
    rows: AtomicU16,
}

impl Session {
    /// Spawn the primary command and start the session's background tasks
    /// (PTY read/write pump, classification tick, fallback recovery). Does
    /// not mark the session attached — the caller (orchestrator `attach`)
    /// does that separately once the `Session` is registered (§4.7).
    pub async fn spawn(
        id: SessionId,
        project: String,
        worktree: String,
        preset: CommandPreset,
        settings: SessionSettings,
        detector: Box<dyn Detector>,
        hooks: HookTable,
        git_context: WorktreeGitContext,
        bus: EventBus,
        cols: u16,
        rows: u16,
    ) -> anyhow::Result<std::sync::Arc<Self>> {
        let backend = NativePty::spawn(&preset.primary_argv(), cols, rows, &settings.term, &worktree)?;

        let session = std::sync::Arc::new(Session {
            id,
            project,
            worktree,
            preset,
            detector,
            hooks,
            git_context,
            bus,
            seq: AtomicU64::new(0),
            record: StdMutex::new(SessionRecord {
                transition: TransitionEngine::new(AgentState::Busy),
                is_primary_command: true,
                is_attached: false,
                auto_approval_blocked: false,
                auto_approval_reason: None,
                last_activity: Instant::now(),
            }),
            screen: AsyncMutex::new(Screen::new(cols, rows)),
            ring: AsyncMutex::new(RingBuffer::new(settings.ring_capacity)),
            backend: AsyncMutex::new(None),
            auto_approval_cancel: StdMutex::new(None),
            has_background_task: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            cols: AtomicU16::new(cols),
            rows: AtomicU16::new(rows),
            settings,
        });

        session.publish(EventKind::SessionCreated {
            project: session.project.clone(),
            worktree: session.worktree.clone(),
        });

        session.install_backend(backend.boxed()).await;
        Session::spawn_run_loop(session.clone());

        Ok(session)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Recovers from poisoning instead of panicking (§5).
    fn record(&self) -> std::sync::MutexGuard<'_, SessionRecord> {
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.auto_approval_cancel.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, kind: EventKind) {
        self.bus.publish(Event::new(self.id, self.next_seq(), kind));
    }

    async fn install_backend(self: &std::sync::Arc<Self>, mut backend: Box<dyn Backend>) {
        let (output_tx, output_rx) = mpsc::channel::<Bytes>(1024);
        let (input_tx, input_rx) = mpsc::channel::<BackendInput>(256);

        let join = tokio::spawn(async move { backend.run(output_tx, input_rx).await });

        *self.backend.lock().await = Some(BackendHandle { input_tx, join });
        self.spawn_output_pump(output_rx);
    }

    /// Pump raw PTY bytes into the screen, ring buffer, and event bus. Runs
    /// for the lifetime of one backend instance; a fallback respawn starts a
    /// fresh pump alongside a fresh backend task.
    fn spawn_output_pump(self: &std::sync::Arc<Self>, mut output_rx: mpsc::Receiver<Bytes>) {
        let session = self.clone();
        tokio::spawn(async move {
            while let Some(data) = output_rx.recv().await {
                {
                    let mut screen = session.screen.lock().await;
                    screen.feed(&data);
                }
                {
                    let mut ring = session.ring.lock().await;
                    ring.write(&data);
                }
                session.publish(EventKind::SessionData { bytes: data });
            }
        });
    }

    /// The run loop that owns the classification tick and reacts to backend
    /// exit. Separate from the output pump so a fallback respawn only needs
    /// to replace the backend + pump, not this outer loop.
    fn spawn_run_loop(session: std::sync::Arc<Self>) {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(session.settings.tick_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tick.tick().await;
                if session.destroyed.load(Ordering::Acquire) {
                    return;
                }

                if let Some(status) = session.poll_backend_exit().await {
                    if session.handle_exit(status).await {
                        continue; // fallback respawned, keep ticking
                    }
                    return; // destroyed
                }

                session.run_classification_tick().await;
            }
        });
    }

    /// Non-blocking check of whether the current backend task has finished.
    /// Takes the handle out (and drops the lock) before awaiting its join,
    /// so a long-running child never blocks `send_input`/`resize`/`terminate`
    /// from acquiring the backend slot in the meantime.
    async fn poll_backend_exit(&self) -> Option<ExitStatus> {
        let handle = {
            let mut guard = self.backend.lock().await;
            match guard.as_ref() {
                Some(handle) if handle.join.is_finished() => guard.take(),
                _ => None,
            }
        }?;

        match handle.join.await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(err)) => {
                warn!(session_id = %self.id, %err, "backend task failed");
                Some(ExitStatus { code: Some(1), signal: None })
            }
            Err(err) => {
                warn!(session_id = %self.id, %err, "backend task panicked");
                Some(ExitStatus { code: Some(1), signal: None })
            }
        }
    }

    /// PTY Process Manager exit handling (§4.5, §7). Returns `true` if the
    /// session is still alive (a fallback was respawned), `false` if it has
    /// been destroyed.
    async fn handle_exit(self: &std::sync::Arc<Self>, status: ExitStatus) -> bool {
        let is_primary = self.record().is_primary_command;

        if crate::pty::should_fallback(status, is_primary) {
            let argv = self.preset.fallback_argv();
            info!(session_id = %self.id, argv = ?argv, "respawning with fallback command");

            let cols = self.cols.load(Ordering::Relaxed);
            let rows = self.rows.load(Ordering::Relaxed);
            match NativePty::spawn(&argv, cols, rows, &self.settings.term, &self.worktree) {
                Ok(backend) => {
                    self.record().is_primary_command = false;
                    self.install_backend(backend.boxed()).await;
                    self.publish(EventKind::SessionProcessReplaced { is_primary_command: false });
                    return true;
                }
                Err(err) => {
                    warn!(session_id = %self.id, %err, "fallback respawn failed");
                }
            }
        }

        self.destroy_internal(status).await;
        false
    }

    async fn destroy_internal(&self, status: ExitStatus) {
        info!(session_id = %self.id, reason = ?DestroyReason::ExitedNoFallback, "session destroyed");
        self.cancel_auto_approval();
        self.destroyed.store(true, Ordering::Release);
        self.publish(EventKind::SessionExit { exit_code: status.code, signal: status.signal });
        self.publish(EventKind::SessionDestroyed);
    }

    /// Debounce & Transition Engine tick (§4.3) plus the downstream
    /// auto-approval trigger (step 6) and background-task refresh (step 7).
    async fn run_classification_tick(self: &std::sync::Arc<Self>) {
        let lines = {
            let screen = self.screen.lock().await;
            screen.visible_lines(self.settings.visible_lines)
        };

        let previous = { self.record().transition.current_state() };
        let detected = self.detector.classify(&lines, previous);
        self.has_background_task.store(self.detector.has_background_task(&lines), Ordering::Relaxed);

        let (auto_approval_enabled, auto_approval_blocked) = {
            let record = self.record();
            (self.settings.auto_approval_enabled, record.auto_approval_blocked)
        };

        let now = Instant::now();
        let outcome = {
            let mut record = self.record();
            record.last_activity = now;
            record.transition.tick(
                detected,
                now,
                self.settings.persistence_window,
                auto_approval_enabled,
                auto_approval_blocked,
            )
        };

        if let Confirmation::Confirmed { old, new, clear_auto_approval_block } = outcome {
            debug!(session_id = %self.id, ?old, ?new, "confirmed state transition");
            if clear_auto_approval_block {
                self.record().auto_approval_blocked = false;
            }
            self.publish(EventKind::SessionStateChanged { old_state: old, new_state: new });
            self.fire_hooks(old, new);
        }

        let should_trigger_auto_approval = {
            let current = self.record().transition.current_state();
            current == AgentState::PendingAutoApproval && self.cancel_slot().is_none()
        };
        if should_trigger_auto_approval {
            Session::spawn_auto_approval(self.clone());
        }
    }

    fn fire_hooks(&self, old: AgentState, new: AgentState) {
        fire_transition_hooks(
            &self.hooks,
            TransitionContext {
                session_id: self.id,
                old_state: old,
                new_state: new,
                worktree_path: self.worktree.clone(),
                worktree_branch: self.git_context.branch.clone(),
                git_root: self.git_context.git_root.clone(),
                base_branch: self.git_context.base_branch.clone(),
                extra_env: HashMap::new(),
            },
        );
    }

    /// Auto-Approval Pipeline (§4.4). Installs a fresh cancellation handle,
    /// snapshots the screen, and invokes the policy oracle; the result is
    /// discarded if the session has since left `pending_auto_approval`.
    fn spawn_auto_approval(session: std::sync::Arc<Self>) {
        let cancel = CancellationToken::new();
        *session.cancel_slot() = Some(cancel.clone());

        tokio::spawn(async move {
            let snapshot = {
                let screen = session.screen.lock().await;
                screen.visible_lines(300).join("\n")
            };

            let outcome = autoapprove::run_policy_oracle(&session.settings.policy_oracle, &snapshot, &cancel).await;

            // Only one verification is ever in flight at a time (gated by
            // the `is_none()` check before this task is spawned), so it is
            // always safe to clear the slot here — a cancellation from
            // elsewhere (send_input, terminate) may have already cleared it.
            session.cancel_slot().take();

            let left_pending = {
                let record = session.record();
                record.transition.current_state() != AgentState::PendingAutoApproval
            };

            if cancel.is_cancelled() || left_pending {
                return; // discarded (§4.4 step 4, cancellation semantics §5)
            }

            session.apply_auto_approval_outcome(outcome).await;
        });
    }

    async fn apply_auto_approval_outcome(&self, outcome: OracleOutcome) {
        if outcome.needs_permission {
            let old = {
                let mut record = self.record();
                record.auto_approval_blocked = true;
                record.auto_approval_reason = outcome.reason.clone();
                record.transition.force(AgentState::WaitingInput)
            };
            warn!(session_id = %self.id, reason = ?outcome.reason, "auto-approval blocked");
            self.publish(EventKind::SessionStateChanged { old_state: old, new_state: AgentState::WaitingInput });
            self.fire_hooks(old, AgentState::WaitingInput);
        } else {
            self.write_to_backend(Bytes::from_static(b"\r")).await;
            let old = {
                let mut record = self.record();
                record.auto_approval_reason = None;
                record.transition.force(AgentState::Busy)
            };
            self.publish(EventKind::SessionStateChanged { old_state: old, new_state: AgentState::Busy });
            self.fire_hooks(old, AgentState::Busy);
        }
    }

    fn cancel_auto_approval(&self) {
        if let Some(cancel) = self.cancel_slot().take() {
            cancel.cancel();
        }
    }

    /// Operator cancellation of an in-flight verification (§4.4 step 3:
    /// cancellation is treated as `needs_permission = true`, not as "nothing
    /// happened"). Without this, the confirmed state stays
    /// `pending_auto_approval` with an empty cancel slot, and the very next
    /// classification tick re-triggers the oracle against the operator's own
    /// keystroke.
    fn force_block_on_operator_cancel(&self) {
        let old = {
            let mut record = self.record();
            record.auto_approval_blocked = true;
            record.auto_approval_reason = Some("auto-approval cancelled by operator input".to_string());
            record.transition.force(AgentState::WaitingInput)
        };
        self.publish(EventKind::SessionStateChanged { old_state: old, new_state: AgentState::WaitingInput });
        self.fire_hooks(old, AgentState::WaitingInput);
    }

    async fn write_to_backend(&self, data: Bytes) {
        let guard = self.backend.lock().await;
        if let Some(handle) = guard.as_ref() {
            let _ = handle.input_tx.send(BackendInput::Write(data)).await;
        }
    }

    // ---- Public operations (§4.6) ----------------------------------

    /// Mark the session active, publish `session_restore` with the stripped
    /// scrollback replay, and resize to the operator's current dimensions.
    pub async fn attach(&self, cols: u16, rows: u16) {
        {
            let mut record = self.record();
            record.is_attached = true;
        }
        let replay = {
            let ring = self.ring.lock().await;
            ring.replay_stripped()
        };
        self.publish(EventKind::SessionRestore { replay: Bytes::from(replay) });
        self.resize(cols, rows).await;
    }

    /// Mark the session inactive. PTY bytes continue to be consumed (the
    /// output pump never checks `is_attached`) so the virtual terminal stays
    /// current, but the attach-side forwarding owned by the UI stops.
    pub fn detach(&self) {
        self.record().is_attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.record().is_attached
    }

    pub fn current_state(&self) -> AgentState {
        self.record().transition.current_state()
    }

    pub fn has_background_task(&self) -> bool {
        self.has_background_task.load(Ordering::Relaxed)
    }

    pub fn auto_approval_blocked(&self) -> bool {
        self.record().auto_approval_blocked
    }

    /// Filters for the reserved "return to menu" shortcut (delegating to
    /// detach; the orchestrator-side notification is the caller's job, §4.6)
    /// and, when the session is mid-verification, cancels it and settles the
    /// confirmed state to `waiting_input` with the auto-approval block set
    /// before forwarding the keystroke (§4.4 step 1, "operator presses any
    /// key"; step 3 treats cancellation as `needs_permission = true`).
    ///
    /// Returns `true` if the bytes were the reserved shortcut (the caller
    /// should treat this as a detach + return-to-menu request instead of a
    /// literal keystroke).
    pub async fn send_input(&self, bytes: Bytes) -> bool {
        if bytes.as_ref() == self.settings.return_to_menu.as_slice() {
            self.detach();
            return true;
        }

        if self.current_state() == AgentState::PendingAutoApproval {
            self.cancel_auto_approval();
            self.force_block_on_operator_cancel();
        }

        self.write_to_backend(bytes).await;
        false
    }

    /// Forward a resize to both the PTY and the virtual terminal (§4.6).
    pub async fn resize(&self, cols: u16, rows: u16) {
        self.cols.store(cols, Ordering::Relaxed);
        self.rows.store(rows, Ordering::Relaxed);
        {
            let guard = self.backend.lock().await;
            if let Some(handle) = guard.as_ref() {
                let _ = handle.input_tx.send(BackendInput::Resize { cols, rows }).await;
            }
        }
        let mut screen = self.screen.lock().await;
        screen.resize(cols, rows);
    }

    /// Cancel in-flight auto-approval, kill the child, and publish
    /// `session_destroyed`. Idempotent (§3 Lifecycle).
    pub async fn terminate(&self, reason: DestroyReason) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return; // already destroyed
        }
        info!(session_id = %self.id, ?reason, "session destroyed");
        self.cancel_auto_approval();

        let handle = self.backend.lock().await.take();
        if let Some(handle) = handle {
            handle.join.abort();
        }

        self.publish(EventKind::SessionDestroyed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
