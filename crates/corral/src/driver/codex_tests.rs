use super::*;

fn lines(s: &str) -> Vec<String> {
    s.lines().map(String::from).collect()
}

#[test]
fn allow_command_literal_is_waiting_input() {
    let det = CodexDetector;
    let screen = lines("Allow command?\n[y/n]\n");
    assert_eq!(det.classify(&screen, AgentState::Busy), AgentState::WaitingInput);
}

#[test]
fn yes_y_literal_is_waiting_input() {
    let det = CodexDetector;
    let screen = lines("Proceed? yes (y)\n");
    assert_eq!(det.classify(&screen, AgentState::Busy), AgentState::WaitingInput);
}

#[test]
fn confirm_regex_is_waiting_input() {
    let det = CodexDetector;
    let screen = lines("Do you want to run this?\nyes\n");
    assert_eq!(det.classify(&screen, AgentState::Idle), AgentState::WaitingInput);
}

#[test]
fn esc_interrupt_regex_is_busy() {
    let det = CodexDetector;
    let screen = lines("thinking...\nesc to interrupt\n");
    assert_eq!(det.classify(&screen, AgentState::Idle), AgentState::Busy);
}

#[test]
fn plain_screen_is_idle() {
    let det = CodexDetector;
    let screen = lines("codex> \n");
    assert_eq!(det.classify(&screen, AgentState::Busy), AgentState::Idle);
}
