use super::*;
use crate::driver::ExitStatus;

#[test]
fn fallback_triggers_only_for_primary_early_exit() {
    assert!(should_fallback(ExitStatus { code: Some(1), signal: None }, true));
}

#[test]
fn fallback_does_not_trigger_for_already_fallback_child() {
    assert!(!should_fallback(ExitStatus { code: Some(1), signal: None }, false));
}

#[test]
fn fallback_does_not_trigger_for_different_exit_code() {
    assert!(!should_fallback(ExitStatus { code: Some(2), signal: None }, true));
}

#[test]
fn fallback_does_not_trigger_for_signal_death() {
    assert!(!should_fallback(ExitStatus { code: None, signal: Some(9) }, true));
}
