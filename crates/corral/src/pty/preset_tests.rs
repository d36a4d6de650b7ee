use super::*;

fn bare_preset() -> CommandPreset {
    CommandPreset {
        id: "claude".into(),
        display_name: "Claude Code".into(),
        command: "claude".into(),
        args: vec!["--bad".into()],
        fallback_args: Some(vec!["--resume".into()]),
        detector: DetectorTag::Claude,
        devcontainer_exec_prefix: None,
    }
}

#[test]
fn primary_argv_is_command_then_args() {
    let preset = bare_preset();
    assert_eq!(preset.primary_argv(), vec!["claude", "--bad"]);
}

#[test]
fn fallback_argv_uses_configured_fallback() {
    let preset = bare_preset();
    assert_eq!(preset.fallback_argv(), vec!["claude", "--resume"]);
}

#[test]
fn fallback_argv_is_empty_args_when_unconfigured() {
    let mut preset = bare_preset();
    preset.fallback_args = None;
    assert_eq!(preset.fallback_argv(), vec!["claude"]);
}

#[test]
fn devcontainer_prefix_wraps_both_primary_and_fallback() {
    let mut preset = bare_preset();
    preset.devcontainer_exec_prefix =
        Some(vec!["devcontainer".into(), "exec".into(), "--workspace-folder".into(), ".".into(), "--".into()]);

    assert_eq!(
        preset.primary_argv(),
        vec!["devcontainer", "exec", "--workspace-folder", ".", "--", "claude", "--bad"]
    );
    assert_eq!(
        preset.fallback_argv(),
        vec!["devcontainer", "exec", "--workspace-folder", ".", "--", "claude", "--resume"]
    );
}

#[test]
fn devcontainer_with_no_fallback_falls_back_to_claude_binary() {
    let mut preset = bare_preset();
    preset.command = "codex".into();
    preset.fallback_args = None;
    preset.devcontainer_exec_prefix = Some(vec!["devcontainer".into(), "exec".into(), "--".into()]);

    assert_eq!(preset.fallback_argv(), vec!["devcontainer", "exec", "--", "claude"]);
}
