//! Auth-session snapshot consumed by views.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session manager publishes one of these on every transition. Route
//! guards and user-aware views read it to decide redirects and what to
//! render; none of them mutate it.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::net::types::User;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// No token held.
    #[default]
    Unauthenticated,
    /// A restored token is held; its user is being fetched.
    Resolving,
    /// Token held and user resolved.
    Authenticated,
    /// The logout deadline fired; the session is being torn down.
    Expiring,
}

impl SessionPhase {
    /// True while a token is held and the user is known.
    #[must_use]
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::Expiring)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Resolving => "resolving",
            Self::Authenticated => "authenticated",
            Self::Expiring => "expiring",
        }
    }
}

/// Authentication state tracking the current user, loading, and last error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
    /// Last operation failure, shown inline by forms.
    pub error: Option<String>,
    pub phase: SessionPhase,
}
