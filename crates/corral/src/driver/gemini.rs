// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::OnceLock;

use regex::Regex;

use super::{classification_text, AgentState, Detector, DetectorTag};

const LITERAL_PROMPTS: &[&str] =
    &["│ apply this change?", "│ allow execution?", "│ do you want to proceed?"];

fn confirm_prompt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)(allow execution|do you want to|apply this change).*?\n+.*?\byes\b")
            .unwrap_or_else(|e| unreachable!("invalid static regex: {e}"))
    })
}

/// Detector for Gemini CLI (§4.2).
pub struct GeminiDetector;

impl Detector for GeminiDetector {
    fn classify(&self, lines: &[String], _previous: AgentState) -> AgentState {
        let text = classification_text(lines);

        if LITERAL_PROMPTS.iter().any(|p| text.contains(p)) {
            return AgentState::WaitingInput;
        }
        if confirm_prompt_re().is_match(&text) {
            return AgentState::WaitingInput;
        }
        if text.contains("esc to cancel") {
            return AgentState::Busy;
        }
        AgentState::Idle
    }

    fn tag(&self) -> DetectorTag {
        DetectorTag::Gemini
    }
}

#[cfg(test)]
#[path = "gemini_tests.rs"]
mod tests;
