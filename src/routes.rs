//! View routes and auth guards.
//!
//! SYSTEM CONTEXT
//! ==============
//! Session operations hand back the [`Route`] the caller should show next;
//! views apply identical redirect rules through the guards below.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use crate::state::auth::AuthState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Profile,
    Movie(u64),
}

impl Route {
    #[must_use]
    pub fn path(self) -> String {
        match self {
            Self::Home => "/home".to_owned(),
            Self::Login => "/login".to_owned(),
            Self::Register => "/register".to_owned(),
            Self::Dashboard => "/dashboard".to_owned(),
            Self::Profile => "/dashboard/profile".to_owned(),
            Self::Movie(id) => format!("/movie/{id}"),
        }
    }

    /// Whether the view needs a signed-in user.
    #[must_use]
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Dashboard | Self::Profile)
    }
}

/// Redirect to `/login` whenever auth has loaded and no user is present.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}

/// Login and register views bounce signed-in users to the dashboard.
#[must_use]
pub fn should_redirect_auth(state: &AuthState) -> bool {
    !state.loading && state.user.is_some()
}

/// Where a view for `route` should send the user instead, if anywhere.
#[must_use]
pub fn guard(route: Route, state: &AuthState) -> Option<Route> {
    if route.requires_auth() && should_redirect_unauth(state) {
        return Some(Route::Login);
    }
    if matches!(route, Route::Login | Route::Register) && should_redirect_auth(state) {
        return Some(Route::Dashboard);
    }
    None
}
