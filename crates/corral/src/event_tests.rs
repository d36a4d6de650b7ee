use super::*;

#[test]
fn kind_tag_matches_spec_names() {
    let session_id = SessionId::nil();
    let cases = [
        (EventKind::SessionCreated { project: "p".into(), worktree: "w".into() }, "session_created"),
        (EventKind::SessionDestroyed, "session_destroyed"),
        (
            EventKind::SessionStateChanged { old_state: AgentState::Busy, new_state: AgentState::Idle },
            "session_state_changed",
        ),
        (EventKind::SessionProcessReplaced { is_primary_command: false }, "session_process_replaced"),
        (EventKind::SessionData { bytes: Bytes::from_static(b"x") }, "session_data"),
        (EventKind::SessionRestore { replay: Bytes::from_static(b"x") }, "session_restore"),
        (EventKind::SessionExit { exit_code: Some(1), signal: None }, "session_exit"),
    ];
    for (kind, expected) in cases {
        let event = Event::new(session_id, 0, kind);
        assert_eq!(event.kind_tag(), expected);
    }
}

#[test]
fn only_session_data_is_high_frequency() {
    assert!(EventKind::SessionData { bytes: Bytes::from_static(b"x") }.is_high_frequency());
    assert!(!EventKind::SessionDestroyed.is_high_frequency());
    assert!(!EventKind::SessionExit { exit_code: None, signal: None }.is_high_frequency());
}
