// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::OnceLock;

use regex::Regex;

use super::{classification_text, AgentState, Detector, DetectorTag};

const LITERAL_PROMPTS: &[&str] = &["allow command?", "[y/n]", "yes (y)"];

fn confirm_prompt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)(do you want|would you like).*?\n+.*?\byes\b")
            .unwrap_or_else(|e| unreachable!("invalid static regex: {e}"))
    })
}

fn interrupt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)esc.*interrupt")
            .unwrap_or_else(|e| unreachable!("invalid static regex: {e}"))
    })
}

/// Detector for Codex CLI (§4.2).
pub struct CodexDetector;

impl Detector for CodexDetector {
    fn classify(&self, lines: &[String], _previous: AgentState) -> AgentState {
        let text = classification_text(lines);

        if LITERAL_PROMPTS.iter().any(|p| text.contains(p)) {
            return AgentState::WaitingInput;
        }
        if confirm_prompt_re().is_match(&text) {
            return AgentState::WaitingInput;
        }
        if interrupt_re().is_match(&text) {
            return AgentState::Busy;
        }
        AgentState::Idle
    }

    fn tag(&self) -> DetectorTag {
        DetectorTag::Codex
    }
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
