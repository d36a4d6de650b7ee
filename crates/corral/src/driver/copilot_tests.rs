use super::*;

fn lines(s: &str) -> Vec<String> {
    s.lines().map(String::from).collect()
}

#[test]
fn do_you_want_literal_is_waiting_input() {
    let det = CopilotDetector;
    let screen = lines("│ Do you want to apply this patch?\n");
    assert_eq!(det.classify(&screen, AgentState::Busy), AgentState::WaitingInput);
}

#[test]
fn esc_to_cancel_is_busy() {
    let det = CopilotDetector;
    let screen = lines("Thinking...\nesc to cancel\n");
    assert_eq!(det.classify(&screen, AgentState::Idle), AgentState::Busy);
}

#[test]
fn plain_screen_is_idle() {
    let det = CopilotDetector;
    let screen = lines("copilot> \n");
    assert_eq!(det.classify(&screen, AgentState::Busy), AgentState::Idle);
}
