// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event tagged union (§3) published through the [`crate::bus::EventBus`].
//!
//! Every variant carries the session identifier it concerns and a
//! monotonically increasing per-session sequence number, so a subscriber that
//! has dropped events (see [`crate::bus`]) can at least detect the gap.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::driver::AgentState;

/// Opaque, globally unique session identifier.
pub type SessionId = uuid::Uuid;

/// A published event, tagged with the session it concerns and a per-session
/// sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub session_id: SessionId,
    pub seq: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(session_id: SessionId, seq: u64, kind: EventKind) -> Self {
        Self { session_id, seq, kind }
    }

    /// Short tag used for hook lookups and log lines.
    pub fn kind_tag(&self) -> &'static str {
        self.kind.tag()
    }
}

/// The tagged union of event kinds (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// A session was created by the orchestrator on first attach.
    SessionCreated { project: String, worktree: String },
    /// A session was torn down (terminate, or destroy_all sweep).
    SessionDestroyed,
    /// A debounced, confirmed state transition (§4.3).
    SessionStateChanged { old_state: AgentState, new_state: AgentState },
    /// The PTY child was swapped for a fallback spawn (§4.5).
    SessionProcessReplaced { is_primary_command: bool },
    /// Raw bytes observed from the PTY. High frequency; see [`crate::bus`]
    /// for the larger queue this kind is given.
    SessionData { bytes: Bytes },
    /// Emitted on `attach()`; the replay payload is the stripped scrollback
    /// (§4.1) needed to reconstruct the visible screen.
    SessionRestore { replay: Bytes },
    /// The PTY child exited with no viable fallback remaining.
    SessionExit { exit_code: Option<i32>, signal: Option<i32> },
}

impl EventKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::SessionDestroyed => "session_destroyed",
            Self::SessionStateChanged { .. } => "session_state_changed",
            Self::SessionProcessReplaced { .. } => "session_process_replaced",
            Self::SessionData { .. } => "session_data",
            Self::SessionRestore { .. } => "session_restore",
            Self::SessionExit { .. } => "session_exit",
        }
    }

    /// Whether this kind is the high-frequency byte stream, which the event
    /// bus gives a larger per-subscription queue (§4.9).
    pub fn is_high_frequency(&self) -> bool {
        matches!(self, Self::SessionData { .. })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
