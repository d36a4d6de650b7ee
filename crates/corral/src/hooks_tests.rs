use super::*;

fn enabled_hook(command: &str) -> HookDefinition {
    HookDefinition { command: command.to_string(), enabled: true, scope: HookScope::StatusTransition }
}

#[test]
fn exact_transition_and_wildcard_both_apply() {
    let table = HookTable::new()
        .on_transition(AgentState::Busy, AgentState::Idle, enabled_hook("echo exact"))
        .on_any_transition(enabled_hook("echo wildcard"));

    let hooks = table.hooks_for_transition(AgentState::Busy, AgentState::Idle);
    assert_eq!(hooks.len(), 2);
}

#[test]
fn unrelated_transition_only_gets_wildcard() {
    let table = HookTable::new()
        .on_transition(AgentState::Busy, AgentState::Idle, enabled_hook("echo exact"))
        .on_any_transition(enabled_hook("echo wildcard"));

    let hooks = table.hooks_for_transition(AgentState::Idle, AgentState::Busy);
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].command, "echo wildcard");
}

#[test]
fn disabled_hooks_are_excluded() {
    let mut disabled = enabled_hook("echo never");
    disabled.enabled = false;
    let table = HookTable::new().on_transition(AgentState::Busy, AgentState::Idle, disabled);

    assert!(table.hooks_for_transition(AgentState::Busy, AgentState::Idle).is_empty());
}

#[tokio::test]
async fn fire_transition_hooks_spawns_without_blocking() {
    let table = HookTable::new().on_transition(
        AgentState::Busy,
        AgentState::Idle,
        enabled_hook("exit 0"),
    );
    let ctx = TransitionContext {
        session_id: Uuid::nil(),
        old_state: AgentState::Busy,
        new_state: AgentState::Idle,
        worktree_path: "/repo/wt-1".to_string(),
        worktree_branch: "feature/x".to_string(),
        git_root: "/repo".to_string(),
        base_branch: Some("main".to_string()),
        extra_env: HashMap::new(),
    };

    let started = std::time::Instant::now();
    fire_transition_hooks(&table, ctx);
    assert!(started.elapsed() < std::time::Duration::from_millis(50));
}
