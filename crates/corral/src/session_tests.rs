use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::*;
use crate::bus::Subscription;
use crate::driver::build_detector;
use crate::driver::DetectorTag;

fn preset(command: Vec<String>, fallback_args: Option<Vec<String>>) -> CommandPreset {
    let (command, args) = command.split_first().expect("non-empty command");
    CommandPreset {
        id: "test".to_string(),
        display_name: "test".to_string(),
        command: command.clone(),
        args: args.to_vec(),
        fallback_args,
        detector: DetectorTag::Unknown,
        devcontainer_exec_prefix: None,
    }
}

fn fast_settings() -> SessionSettings {
    SessionSettings { tick_interval: Duration::from_millis(20), ..SessionSettings::default() }
}

async fn spawn_session(
    command: Vec<String>,
    fallback_args: Option<Vec<String>>,
    settings: SessionSettings,
) -> (std::sync::Arc<Session>, Subscription) {
    let bus = EventBus::new();
    let subscription = bus.subscribe();
    let session = Session::spawn(
        Uuid::new_v4(),
        "project".to_string(),
        "/tmp".to_string(),
        preset(command, fallback_args),
        settings,
        build_detector(DetectorTag::Unknown),
        HookTable::new(),
        WorktreeGitContext::default(),
        bus,
        80,
        24,
    )
    .await
    .expect("spawn");
    (session, subscription)
}

async fn recv_until(subscription: &Subscription, predicate: impl Fn(&EventKind) -> bool) -> EventKind {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
            .await
            .expect("event within timeout");
        if predicate(&event.kind) {
            return event.kind;
        }
    }
}

#[tokio::test]
async fn spawn_publishes_session_created_first() {
    let (session, subscription) =
        spawn_session(vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()], None, fast_settings())
            .await;

    let first = subscription.recv().await;
    assert!(matches!(first.kind, EventKind::SessionCreated { .. }));

    session.terminate(DestroyReason::OperatorRequested).await;
}

#[tokio::test]
async fn attach_publishes_restore_with_replay_of_prior_output() {
    let (session, subscription) = spawn_session(
        vec!["/bin/sh".to_string(), "-c".to_string(), "printf hello-world; sleep 5".to_string()],
        None,
        fast_settings(),
    )
    .await;

    recv_until(&subscription, |k| matches!(k, EventKind::SessionData { bytes } if bytes.as_ref().starts_with(b"hello"))).await;

    session.attach(80, 24).await;
    let restore = recv_until(&subscription, |k| matches!(k, EventKind::SessionRestore { .. })).await;
    match restore {
        EventKind::SessionRestore { replay } => {
            assert!(String::from_utf8_lossy(&replay).contains("hello-world"));
        }
        _ => unreachable!(),
    }
    assert!(session.is_attached());

    session.terminate(DestroyReason::OperatorRequested).await;
}

#[tokio::test]
async fn send_input_forwards_bytes_to_the_child() {
    let (session, subscription) =
        spawn_session(vec!["/bin/sh".to_string(), "-c".to_string(), "cat".to_string()], None, fast_settings()).await;

    recv_until(&subscription, |k| matches!(k, EventKind::SessionCreated { .. })).await;
    let consumed = session.send_input(Bytes::from_static(b"ping\n")).await;
    assert!(!consumed);

    recv_until(&subscription, |k| matches!(k, EventKind::SessionData { bytes } if bytes.as_ref().starts_with(b"ping"))).await;

    session.terminate(DestroyReason::OperatorRequested).await;
}

#[tokio::test]
async fn send_input_return_to_menu_detaches_instead_of_forwarding() {
    let (session, subscription) =
        spawn_session(vec!["/bin/sh".to_string(), "-c".to_string(), "cat".to_string()], None, fast_settings()).await;
    recv_until(&subscription, |k| matches!(k, EventKind::SessionCreated { .. })).await;

    session.attach(80, 24).await;
    assert!(session.is_attached());

    let consumed = session.send_input(Bytes::from_static(DEFAULT_RETURN_TO_MENU)).await;
    assert!(consumed);
    assert!(!session.is_attached());

    session.terminate(DestroyReason::OperatorRequested).await;
}

#[tokio::test]
async fn operator_input_during_pending_auto_approval_settles_to_waiting_input_blocked() {
    // §8 scenario 5: the operator types while a verification is in flight.
    let (session, subscription) =
        spawn_session(vec!["/bin/sh".to_string(), "-c".to_string(), "cat".to_string()], None, fast_settings()).await;
    recv_until(&subscription, |k| matches!(k, EventKind::SessionCreated { .. })).await;

    {
        let mut record = session.record();
        record.transition.force(AgentState::PendingAutoApproval);
    }
    let cancel = CancellationToken::new();
    *session.cancel_slot() = Some(cancel.clone());

    let consumed = session.send_input(Bytes::from_static(b"n")).await;
    assert!(!consumed);

    assert!(cancel.is_cancelled());
    assert!(session.cancel_slot().is_none());
    assert_eq!(session.current_state(), AgentState::WaitingInput);
    assert!(session.auto_approval_blocked());

    recv_until(&subscription, |k| {
        matches!(
            k,
            EventKind::SessionStateChanged {
                old_state: AgentState::PendingAutoApproval,
                new_state: AgentState::WaitingInput
            }
        )
    })
    .await;

    // The blocked flag must hold across at least one more classification
    // tick, or the oracle would immediately re-trigger against the
    // operator's own keystroke.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.current_state(), AgentState::WaitingInput);
    assert!(session.auto_approval_blocked());

    session.terminate(DestroyReason::OperatorRequested).await;
}

#[tokio::test]
async fn early_exit_of_primary_command_triggers_fallback_respawn() {
    let (session, subscription) = spawn_session(
        vec!["/bin/sh".to_string(), "-c".to_string(), "exit 1".to_string()],
        Some(vec!["-c".to_string(), "printf fallback-ran; sleep 5".to_string()]),
        fast_settings(),
    )
    .await;

    recv_until(&subscription, |k| {
        matches!(k, EventKind::SessionProcessReplaced { is_primary_command: false })
    })
    .await;
    recv_until(&subscription, |k| matches!(k, EventKind::SessionData { bytes } if bytes.as_ref().starts_with(b"fallback")))
        .await;

    assert!(!session.is_destroyed());
    session.terminate(DestroyReason::OperatorRequested).await;
}

#[tokio::test]
async fn early_exit_with_no_fallback_destroys_the_session() {
    let (session, subscription) =
        spawn_session(vec!["/bin/sh".to_string(), "-c".to_string(), "exit 1".to_string()], None, fast_settings())
            .await;

    recv_until(&subscription, |k| matches!(k, EventKind::SessionExit { exit_code: Some(1), signal: None })).await;
    recv_until(&subscription, |k| matches!(k, EventKind::SessionDestroyed)).await;

    // run loop polls destroyed on its own tick, so this may briefly lag.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(session.is_destroyed());
}

#[tokio::test]
async fn terminate_is_idempotent_and_only_publishes_once() {
    let (session, subscription) =
        spawn_session(vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()], None, fast_settings())
            .await;
    recv_until(&subscription, |k| matches!(k, EventKind::SessionCreated { .. })).await;

    session.terminate(DestroyReason::OperatorRequested).await;
    session.terminate(DestroyReason::OperatorRequested).await;

    let mut destroyed_count = 0;
    while let Some(event) = subscription.try_recv() {
        if matches!(event.kind, EventKind::SessionDestroyed) {
            destroyed_count += 1;
        }
    }
    assert_eq!(destroyed_count, 1);
    assert!(session.is_destroyed());
}

#[tokio::test]
async fn resize_is_reflected_in_subsequent_screen_reads() {
    let (session, subscription) =
        spawn_session(vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()], None, fast_settings())
            .await;
    recv_until(&subscription, |k| matches!(k, EventKind::SessionCreated { .. })).await;

    session.resize(120, 40).await;
    assert_eq!(session.cols.load(std::sync::atomic::Ordering::Relaxed), 120);
    assert_eq!(session.rows.load(std::sync::atomic::Ordering::Relaxed), 40);

    session.terminate(DestroyReason::OperatorRequested).await;
}
