use super::*;

// =============================================================
// AuthState defaults
// =============================================================

#[test]
fn auth_state_default_no_user() {
    let state = AuthState::default();
    assert!(state.user.is_none());
    assert!(state.error.is_none());
}

#[test]
fn auth_state_default_not_loading() {
    let state = AuthState::default();
    assert!(!state.loading);
    assert_eq!(state.phase, SessionPhase::Unauthenticated);
}

// =============================================================
// SessionPhase
// =============================================================

#[test]
fn expiring_still_counts_as_authenticated() {
    assert!(SessionPhase::Authenticated.is_authenticated());
    assert!(SessionPhase::Expiring.is_authenticated());
    assert!(!SessionPhase::Resolving.is_authenticated());
    assert!(!SessionPhase::Unauthenticated.is_authenticated());
}

#[test]
fn phase_names() {
    assert_eq!(SessionPhase::Resolving.as_str(), "resolving");
    assert_eq!(SessionPhase::Expiring.as_str(), "expiring");
}
