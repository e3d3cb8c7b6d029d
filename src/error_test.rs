use super::*;

// =============================================================================
// user_message
// =============================================================================

#[test]
fn rejected_message_is_passed_through_verbatim() {
    let err = SessionError::Rejected { status: 401, message: "Invalid username or password".into() };
    assert_eq!(err.user_message(), "Invalid username or password");
    assert_eq!(err.to_string(), "Invalid username or password");
}

#[test]
fn transport_collapses_to_generic_message() {
    let err = SessionError::Transport("connection refused (os error 111)".into());
    assert_eq!(err.user_message(), NETWORK_ERROR_MESSAGE);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn unauthenticated_message_matches_constant() {
    assert_eq!(SessionError::Unauthenticated.user_message(), UNAUTHENTICATED_MESSAGE);
    assert_eq!(SessionError::Unauthenticated.to_string(), UNAUTHENTICATED_MESSAGE);
}

#[test]
fn every_session_error_has_non_empty_user_message() {
    let all = [
        SessionError::Rejected { status: 500, message: "boom".into() },
        SessionError::Transport("x".into()),
        SessionError::MalformedResponse("missing token".into()),
        SessionError::Unauthenticated,
        SessionError::Store("disk full".into()),
        SessionError::HttpClientBuild("tls".into()),
        SessionError::Superseded,
    ];
    for err in all {
        assert!(!err.user_message().is_empty(), "empty message for {err:?}");
    }
}

// =============================================================================
// status / error_code
// =============================================================================

#[test]
fn status_only_for_rejections() {
    assert_eq!(SessionError::Rejected { status: 409, message: String::new() }.status(), Some(409));
    assert_eq!(SessionError::Transport("x".into()).status(), None);
}

#[test]
fn session_error_codes() {
    let unauthorized = SessionError::Rejected { status: 401, message: String::new() };
    assert_eq!(unauthorized.error_code(), "E_UNAUTHORIZED");
    let conflict = SessionError::Rejected { status: 409, message: String::new() };
    assert_eq!(conflict.error_code(), "E_CONFLICT");
    let other = SessionError::Rejected { status: 500, message: String::new() };
    assert_eq!(other.error_code(), "E_REJECTED");
    assert_eq!(SessionError::Store("x".into()).error_code(), "E_STORE");
    assert_eq!(SessionError::Superseded.error_code(), "E_SUPERSEDED");
}

#[test]
fn catalog_error_codes_and_display() {
    let err = CatalogError::Status { status: 503, body: "down".into() };
    assert_eq!(err.error_code(), "E_CATALOG_STATUS");
    assert_eq!(err.to_string(), "catalog response error: status 503");
    assert_eq!(CatalogError::Parse("eof".into()).error_code(), "E_CATALOG_PARSE");
}
