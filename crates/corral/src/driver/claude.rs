// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::OnceLock;

use regex::Regex;

use super::{classification_text, AgentState, Detector, DetectorTag};

fn confirm_prompt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)(do you want|would you like).+\n+.*?(yes|❯)")
            .unwrap_or_else(|e| unreachable!("invalid static regex: {e}"))
    })
}

/// Detector for Claude Code (§4.2, also the fallback for unrecognized
/// agents).
pub struct ClaudeDetector;

impl Detector for ClaudeDetector {
    fn classify(&self, lines: &[String], previous: AgentState) -> AgentState {
        let text = classification_text(lines);

        if text.contains("ctrl+r to toggle") {
            return previous;
        }
        if confirm_prompt_re().is_match(&text) {
            return AgentState::WaitingInput;
        }
        if text.contains("esc to interrupt") {
            return AgentState::Busy;
        }
        AgentState::Idle
    }

    fn tag(&self) -> DetectorTag {
        DetectorTag::Claude
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
