// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::OnceLock;

use regex::Regex;

use super::{classification_text, AgentState, Detector, DetectorTag};

fn waiting_input_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(act|plan) mode\].*\n.*yes")
            .unwrap_or_else(|e| unreachable!("invalid static regex: {e}"))
    })
}

fn idle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\[(act|plan) mode\].*cline is ready for your message")
            .unwrap_or_else(|e| unreachable!("invalid static regex: {e}"))
    })
}

/// Detector for Cline (§4.2). Unlike the other agents, the default fallthrough
/// here is `busy`, not `idle` — Cline only reports idle on an explicit
/// "ready for your message" line.
pub struct ClineDetector;

impl Detector for ClineDetector {
    fn classify(&self, lines: &[String], _previous: AgentState) -> AgentState {
        let text = classification_text(lines);

        if waiting_input_re().is_match(&text) || text.contains("let cline use this tool") {
            return AgentState::WaitingInput;
        }
        if idle_re().is_match(&text) || text.contains("cline is ready for your message") {
            return AgentState::Idle;
        }
        AgentState::Busy
    }

    fn tag(&self) -> DetectorTag {
        DetectorTag::Cline
    }
}

#[cfg(test)]
#[path = "cline_tests.rs"]
mod tests;
