// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::OnceLock;

use regex::Regex;

use super::{classification_text, AgentState, Detector, DetectorTag};

fn auto_shift_tab_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"auto .* \(shift\+tab\)")
            .unwrap_or_else(|e| unreachable!("invalid static regex: {e}"))
    })
}

/// Detector for Cursor CLI (§4.2).
pub struct CursorDetector;

impl Detector for CursorDetector {
    fn classify(&self, lines: &[String], _previous: AgentState) -> AgentState {
        let text = classification_text(lines);

        if text.contains("(y) (enter)") || text.contains("keep (n)") || auto_shift_tab_re().is_match(&text)
        {
            return AgentState::WaitingInput;
        }
        if text.contains("ctrl+c to stop") {
            return AgentState::Busy;
        }
        AgentState::Idle
    }

    fn tag(&self) -> DetectorTag {
        DetectorTag::Cursor
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
