// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debounce & Transition Engine (§4.3): applies a persistence window to raw
//! detector output before treating a classification as a confirmed state
//! change, and layers the one-time `waiting_input -> pending_auto_approval`
//! upgrade on top.

use std::time::{Duration, Instant};

use crate::driver::AgentState;

/// Default persistence window (§4.3).
pub const DEFAULT_PERSISTENCE_WINDOW: Duration = Duration::from_millis(1500);

/// Outcome of one debounce tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The detector still agrees with the current confirmed state; any
    /// pending candidate was cleared.
    NoChange,
    /// A candidate is being tracked but has not yet held for the full
    /// persistence window.
    Pending,
    /// The transition was confirmed this tick.
    Confirmed {
        old: AgentState,
        new: AgentState,
        /// Whether the caller should clear `auto_approval_blocked` (§4.3
        /// step 5): the base classification left the waiting/auto-approval
        /// cluster while the session was blocked.
        clear_auto_approval_block: bool,
    },
}

/// Per-session debounce state. Owned by the session alongside its detector;
/// every mutation happens through `tick` or `force`, both of which take
/// `&mut self` so the session's state mutex is the only synchronization
/// this type needs.
#[derive(Debug)]
pub struct TransitionEngine {
    current_state: AgentState,
    pending: Option<(AgentState, Instant)>,
}

impl TransitionEngine {
    pub fn new(initial: AgentState) -> Self {
        Self { current_state: initial, pending: None }
    }

    pub fn current_state(&self) -> AgentState {
        self.current_state
    }

    /// Apply one classification tick (§4.3 steps 1-5).
    ///
    /// `auto_approval_enabled` and `auto_approval_blocked` gate the
    /// `waiting_input -> pending_auto_approval` upgrade; they are read from
    /// the session's configuration/state at call time, not cached here.
    pub fn tick(
        &mut self,
        detected: AgentState,
        now: Instant,
        persistence_window: Duration,
        auto_approval_enabled: bool,
        auto_approval_blocked: bool,
    ) -> Confirmation {
        // A confirmed `pending_auto_approval` still reads as `waiting_input`
        // from the detector's point of view (the agent's prompt hasn't
        // changed); treat that as agreement rather than re-debouncing.
        let agrees = detected == self.current_state
            || (detected == AgentState::WaitingInput && self.current_state == AgentState::PendingAutoApproval);

        if agrees {
            self.pending = None;
            return Confirmation::NoChange;
        }

        match self.pending {
            Some((candidate, since)) if candidate == detected => {
                if now.duration_since(since) >= persistence_window {
                    let old = self.current_state;
                    let upgrade = detected == AgentState::WaitingInput
                        && auto_approval_enabled
                        && !auto_approval_blocked;
                    let new = if upgrade { AgentState::PendingAutoApproval } else { detected };

                    self.current_state = new;
                    self.pending = None;

                    let clear_auto_approval_block = !detected.is_waiting_cluster() && auto_approval_blocked;

                    Confirmation::Confirmed { old, new, clear_auto_approval_block }
                } else {
                    Confirmation::Pending
                }
            }
            _ => {
                self.pending = Some((detected, now));
                Confirmation::Pending
            }
        }
    }

    /// Force the confirmed state directly, bypassing debounce. Used by the
    /// auto-approval pipeline (§4.4 steps 5-6), which transitions state as a
    /// side effect of an oracle result rather than of detector agreement.
    pub fn force(&mut self, new_state: AgentState) -> AgentState {
        let old = self.current_state;
        self.current_state = new_state;
        self.pending = None;
        old
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
