// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{classification_text, AgentState, Detector, DetectorTag};

/// Detector for GitHub Copilot CLI (§4.2).
pub struct CopilotDetector;

impl Detector for CopilotDetector {
    fn classify(&self, lines: &[String], _previous: AgentState) -> AgentState {
        let text = classification_text(lines);

        if text.contains("│ do you want") {
            return AgentState::WaitingInput;
        }
        if text.contains("esc to cancel") {
            return AgentState::Busy;
        }
        AgentState::Idle
    }

    fn tag(&self) -> DetectorTag {
        DetectorTag::Copilot
    }
}

#[cfg(test)]
#[path = "copilot_tests.rs"]
mod tests;
