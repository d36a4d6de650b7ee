use super::*;

#[test]
fn delegates_to_claude_rules() {
    let det = UnknownDetector;
    let screen: Vec<String> =
        "Do you want to continue?\n❯ 1. Yes\n2. No\n".lines().map(String::from).collect();
    assert_eq!(det.classify(&screen, AgentState::Busy), AgentState::WaitingInput);
}
