use super::*;

#[test]
fn error_code_display_matches_as_str() {
    for code in [ErrorCode::SpawnFailed, ErrorCode::NotFound, ErrorCode::AlreadyExists, ErrorCode::Exited] {
        assert_eq!(code.to_string(), code.as_str());
    }
}

#[test]
fn supervisor_error_formats_code_and_message() {
    let err = SupervisorError::new(ErrorCode::NotFound, "no session for /repo/wt-1");
    assert_eq!(err.to_string(), "[NOT_FOUND] no session for /repo/wt-1");
}
