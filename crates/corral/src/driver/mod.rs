// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State Detectors (§4.2): one pure classifier per agent family.
//!
//! A [`Detector`] is `(screen_lines, previous_state) -> classified_state`
//! with no side effects and no hidden state (testable property 3). Detectors
//! read only the last [`CLASSIFICATION_WINDOW`] visible lines, lowercased.
//! None of them independently produce [`AgentState::PendingAutoApproval`];
//! that state is layered on by the debounce engine (§4.3). A detector may
//! still *return* it verbatim when a rule says "suppress — keep the
//! previous state," since the previous state can already be that value.

pub mod claude;
pub mod cline;
pub mod codex;
pub mod copilot;
pub mod cursor;
pub mod gemini;
pub mod unknown;

use serde::{Deserialize, Serialize};

/// Number of trailing visible lines a detector is allowed to read (§4.2).
pub const CLASSIFICATION_WINDOW: usize = 30;

/// Base liveness state of an agent, plus the auto-approval sub-state that
/// only the debounce engine assigns (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    Idle,
    Busy,
    WaitingInput,
    PendingAutoApproval,
}

impl AgentState {
    /// Whether this state is part of the waiting/auto-approval cluster that
    /// the fallback-clearing rule in §4.3 step 5 and testable scenario 3
    /// treat specially.
    pub fn is_waiting_cluster(&self) -> bool {
        matches!(self, Self::WaitingInput | Self::PendingAutoApproval)
    }
}

/// Exit code / signal pair observed when a PTY child terminates (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// The specific early-exit shape that triggers fallback recovery
    /// (§4.5): exit code 1, no signal.
    pub fn is_early_exit(&self) -> bool {
        self.code == Some(1) && self.signal.is_none()
    }
}

/// Identifies which per-agent detector a session was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorTag {
    Claude,
    Gemini,
    Codex,
    Cursor,
    Copilot,
    Cline,
    Unknown,
}

/// A pure per-agent classifier. Implementations must not read any state
/// besides their arguments (testable property 3: calling twice with the same
/// inputs yields the same result).
pub trait Detector: Send + Sync {
    /// Classify the current screen against the previous confirmed (or
    /// candidate) state.
    fn classify(&self, lines: &[String], previous: AgentState) -> AgentState;

    /// Heuristic "is a background task running" signal, reported separately
    /// from the main classification (§4.2, last paragraph). The default
    /// heuristic looks at only the last visible line: a trailing braille
    /// spinner glyph or the literal phrase "running in background". Agents
    /// whose background-task affordance looks different override this.
    fn has_background_task(&self, lines: &[String]) -> bool {
        default_has_background_task(lines)
    }

    fn tag(&self) -> DetectorTag;
}

/// Braille spinner frames several agents animate in place while a detached
/// background task runs (§4.2 supplement).
const SPINNER_GLYPHS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Shared default for [`Detector::has_background_task`]: true when the last
/// non-empty visible line contains a braille spinner glyph or the literal
/// phrase "running in background".
pub(crate) fn default_has_background_task(lines: &[String]) -> bool {
    let Some(last) = lines.iter().rev().find(|l| !l.trim().is_empty()) else {
        return false;
    };
    if last.to_lowercase().contains("running in background") {
        return true;
    }
    last.chars().any(|c| SPINNER_GLYPHS.contains(&c))
}

/// Build the detector instance for a given tag. `Unknown` falls back to the
/// Claude detector (§4.2).
pub fn build_detector(tag: DetectorTag) -> Box<dyn Detector> {
    match tag {
        DetectorTag::Claude => Box::new(claude::ClaudeDetector),
        DetectorTag::Gemini => Box::new(gemini::GeminiDetector),
        DetectorTag::Codex => Box::new(codex::CodexDetector),
        DetectorTag::Cursor => Box::new(cursor::CursorDetector),
        DetectorTag::Copilot => Box::new(copilot::CopilotDetector),
        DetectorTag::Cline => Box::new(cline::ClineDetector),
        DetectorTag::Unknown => Box::new(unknown::UnknownDetector),
    }
}

/// Join the trailing `CLASSIFICATION_WINDOW` lines into one lowercased blob
/// for substring/regex matching, the way every per-agent rule list expects.
pub(crate) fn classification_text(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(CLASSIFICATION_WINDOW);
    lines[start..].join("\n").to_lowercase()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
