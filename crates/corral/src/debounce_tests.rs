use proptest::prelude::*;

use super::*;

fn arb_state() -> impl Strategy<Value = AgentState> {
    prop_oneof![
        Just(AgentState::Idle),
        Just(AgentState::Busy),
        Just(AgentState::WaitingInput),
    ]
}

proptest! {
    /// Testable property 2 (§8): for any confirmed transition, the
    /// candidate must have held for at least `PERSISTENCE_WINDOW` of
    /// contiguous agreement immediately beforehand.
    #[test]
    fn debounce_never_confirms_before_the_persistence_window(
        initial in arb_state(),
        candidate in arb_state(),
        window_ms in 200u64..5000,
        short_offset_ms in 0u64..199,
    ) {
        prop_assume!(initial != candidate);
        let window = Duration::from_millis(window_ms);
        let mut engine = TransitionEngine::new(initial);
        let t0 = Instant::now();

        engine.tick(candidate, t0, window, false, false);
        let too_soon = window.saturating_sub(Duration::from_millis(short_offset_ms + 1));
        let outcome = engine.tick(candidate, t0 + too_soon, window, false, false);

        prop_assert_ne!(engine.current_state(), candidate);
        prop_assert!(matches!(outcome, Confirmation::Pending));

        let outcome = engine.tick(candidate, t0 + window, window, false, false);
        prop_assert!(matches!(outcome, Confirmation::Confirmed { new, .. } if new == candidate));
        prop_assert_eq!(engine.current_state(), candidate);
    }
}

#[test]
fn waiting_input_debounce_scenario() {
    // Scenario 1 (§8): one tick at 500ms sees waiting_input but confirmed
    // state stays busy; at 1500ms cumulative it confirms exactly once.
    let mut engine = TransitionEngine::new(AgentState::Busy);
    let t0 = Instant::now();

    let outcome = engine.tick(
        AgentState::WaitingInput,
        t0,
        DEFAULT_PERSISTENCE_WINDOW,
        false,
        false,
    );
    assert_eq!(outcome, Confirmation::Pending);
    assert_eq!(engine.current_state(), AgentState::Busy);

    let outcome = engine.tick(
        AgentState::WaitingInput,
        t0 + Duration::from_millis(500),
        DEFAULT_PERSISTENCE_WINDOW,
        false,
        false,
    );
    assert_eq!(outcome, Confirmation::Pending);
    assert_eq!(engine.current_state(), AgentState::Busy);

    let outcome = engine.tick(
        AgentState::WaitingInput,
        t0 + DEFAULT_PERSISTENCE_WINDOW,
        DEFAULT_PERSISTENCE_WINDOW,
        false,
        false,
    );
    assert_eq!(
        outcome,
        Confirmation::Confirmed {
            old: AgentState::Busy,
            new: AgentState::WaitingInput,
            clear_auto_approval_block: false
        }
    );
    assert_eq!(engine.current_state(), AgentState::WaitingInput);
}

#[test]
fn candidate_reset_restarts_the_window() {
    let mut engine = TransitionEngine::new(AgentState::Busy);
    let t0 = Instant::now();

    engine.tick(AgentState::WaitingInput, t0, DEFAULT_PERSISTENCE_WINDOW, false, false);
    // A different candidate arrives before the window elapses: restart.
    engine.tick(AgentState::Idle, t0 + Duration::from_millis(800), DEFAULT_PERSISTENCE_WINDOW, false, false);
    let outcome = engine.tick(
        AgentState::Idle,
        t0 + Duration::from_millis(800) + DEFAULT_PERSISTENCE_WINDOW - Duration::from_millis(1),
        DEFAULT_PERSISTENCE_WINDOW,
        false,
        false,
    );
    assert_eq!(outcome, Confirmation::Pending);
    assert_eq!(engine.current_state(), AgentState::Busy);
}

#[test]
fn upgrade_to_pending_auto_approval_when_enabled_and_unblocked() {
    let mut engine = TransitionEngine::new(AgentState::Busy);
    let t0 = Instant::now();

    engine.tick(AgentState::WaitingInput, t0, DEFAULT_PERSISTENCE_WINDOW, true, false);
    let outcome = engine.tick(
        AgentState::WaitingInput,
        t0 + DEFAULT_PERSISTENCE_WINDOW,
        DEFAULT_PERSISTENCE_WINDOW,
        true,
        false,
    );
    assert_eq!(
        outcome,
        Confirmation::Confirmed {
            old: AgentState::Busy,
            new: AgentState::PendingAutoApproval,
            clear_auto_approval_block: false
        }
    );
}

#[test]
fn no_upgrade_when_auto_approval_blocked() {
    let mut engine = TransitionEngine::new(AgentState::Busy);
    let t0 = Instant::now();

    engine.tick(AgentState::WaitingInput, t0, DEFAULT_PERSISTENCE_WINDOW, true, true);
    let outcome = engine.tick(
        AgentState::WaitingInput,
        t0 + DEFAULT_PERSISTENCE_WINDOW,
        DEFAULT_PERSISTENCE_WINDOW,
        true,
        true,
    );
    assert_eq!(
        outcome,
        Confirmation::Confirmed {
            old: AgentState::Busy,
            new: AgentState::WaitingInput,
            clear_auto_approval_block: false
        }
    );
}

#[test]
fn pending_auto_approval_does_not_re_debounce_while_prompt_persists() {
    let mut engine = TransitionEngine::new(AgentState::PendingAutoApproval);
    let outcome = engine.tick(
        AgentState::WaitingInput,
        Instant::now(),
        DEFAULT_PERSISTENCE_WINDOW,
        true,
        false,
    );
    assert_eq!(outcome, Confirmation::NoChange);
    assert_eq!(engine.current_state(), AgentState::PendingAutoApproval);
}

#[test]
fn leaving_waiting_cluster_clears_auto_approval_block() {
    let mut engine = TransitionEngine::new(AgentState::WaitingInput);
    let t0 = Instant::now();

    engine.tick(AgentState::Idle, t0, DEFAULT_PERSISTENCE_WINDOW, true, true);
    let outcome = engine.tick(
        AgentState::Idle,
        t0 + DEFAULT_PERSISTENCE_WINDOW,
        DEFAULT_PERSISTENCE_WINDOW,
        true,
        true,
    );
    match outcome {
        Confirmation::Confirmed { clear_auto_approval_block, .. } => assert!(clear_auto_approval_block),
        other => panic!("expected Confirmed, got {other:?}"),
    }
}

#[test]
fn force_bypasses_debounce_and_clears_pending() {
    let mut engine = TransitionEngine::new(AgentState::PendingAutoApproval);
    engine.tick(AgentState::Idle, Instant::now(), DEFAULT_PERSISTENCE_WINDOW, true, false);
    let old = engine.force(AgentState::Busy);
    assert_eq!(old, AgentState::PendingAutoApproval);
    assert_eq!(engine.current_state(), AgentState::Busy);
}
