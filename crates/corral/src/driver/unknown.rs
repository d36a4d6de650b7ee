// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::claude::ClaudeDetector;
use super::{AgentState, Detector, DetectorTag};

/// Detector for an unrecognized agent strategy; falls back to Claude's
/// rules verbatim (§4.2).
pub struct UnknownDetector;

impl Detector for UnknownDetector {
    fn classify(&self, lines: &[String], previous: AgentState) -> AgentState {
        ClaudeDetector.classify(lines, previous)
    }

    fn tag(&self) -> DetectorTag {
        DetectorTag::Unknown
    }
}

#[cfg(test)]
#[path = "unknown_tests.rs"]
mod tests;
