//! Session manager: token lifecycle, persistence, and auto-logout.
//!
//! ARCHITECTURE
//! ============
//! One `SessionManager` owns the bearer token, its absolute expiry, and the
//! resolved user. Views receive it by reference and read [`AuthState`]
//! snapshots from a watch channel; nothing here is ambient global state.
//!
//! Memory and the persisted [`TokenStore`] change together under one lock:
//! a token is written to the store before it becomes visible in memory, and
//! a logout clears both. Every token load arms a single logout timer at
//! `expires_at - margin`; if that instant has already passed the session is
//! logged out on the spot. Tokens are never renewed.
//!
//! CONCURRENCY
//! ===========
//! Mutating operations are serialized by an async gate. `logout` does not
//! take the gate: it bumps an epoch instead, and any operation that started
//! under an older epoch discards its result with [`SessionError::Superseded`].
//! The timer task holds only a weak reference plus a generation number, so a
//! superseded timer that still wakes up does nothing.
//!
//! ERROR HANDLING
//! ==============
//! Failures are returned as typed errors and also written to the shared
//! error slot as a user-facing message. The previous valid state is kept,
//! except during `restore`, which fails closed to logged out.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{DEFAULT_EXPIRY_MARGIN_SECS, SessionConfig};
use crate::error::{ErrorCode, SessionError};
use crate::net::api::{AuthApi, HttpAuthApi};
use crate::net::types::{ProfileUpdate, TokenGrant, User};
use crate::routes::Route;
use crate::state::auth::{AuthState, SessionPhase};
use crate::store::{FileTokenStore, PersistedToken, TokenStore};

// =============================================================================
// SHARED STATE
// =============================================================================

struct Inner {
    token: Option<String>,
    expires_at: Option<u64>,
    user: Option<User>,
    loading: bool,
    error: Option<String>,
    phase: SessionPhase,
    /// Set when the last logout was caused by the expiry timer.
    expired: bool,
    /// Bumped by every logout; in-flight operations compare against it.
    epoch: u64,
    timer: Option<JoinHandle<()>>,
    timer_generation: u64,
}

impl Inner {
    fn snapshot(&self) -> AuthState {
        AuthState { user: self.user.clone(), loading: self.loading, error: self.error.clone(), phase: self.phase }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.timer_generation = self.timer_generation.wrapping_add(1);
    }
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<AuthState>,
    store: Arc<dyn TokenStore>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.snapshot());
    }

    fn logout(&self) {
        let mut inner = self.lock();
        self.logout_locked(&mut inner);
        self.publish(&inner);
    }

    fn logout_locked(&self, inner: &mut Inner) {
        inner.cancel_timer();
        inner.token = None;
        inner.expires_at = None;
        inner.user = None;
        inner.error = None;
        inner.loading = false;
        inner.expired = false;
        inner.phase = SessionPhase::Unauthenticated;
        inner.epoch = inner.epoch.wrapping_add(1);
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
    }

    /// First half of the timer callback: publish `Expiring` while the user
    /// is still present. Returns `false` if `generation` is no longer armed.
    fn begin_expiry(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.timer_generation != generation || inner.token.is_none() {
            return false;
        }
        inner.phase = SessionPhase::Expiring;
        self.publish(&inner);
        true
    }

    /// Second half: log out, unless a logout or a new token replaced this
    /// timer in between.
    fn expire(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.timer_generation != generation || inner.token.is_none() {
            return;
        }
        // The task is finishing on its own; don't abort it from inside.
        inner.timer = None;
        info!("session reached its expiry margin; logging out");
        self.logout_locked(&mut inner);
        inner.expired = true;
        self.publish(&inner);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    margin: Duration,
    shared: Arc<Shared>,
    ops: tokio::sync::Mutex<()>,
}

impl SessionManager {
    /// Manager using the system clock and the default 5-minute margin.
    /// Starts logged out with `loading = true` until [`SessionManager::restore`] runs.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>) -> Self {
        let inner = Inner {
            token: None,
            expires_at: None,
            user: None,
            loading: true,
            error: None,
            phase: SessionPhase::Unauthenticated,
            expired: false,
            epoch: 0,
            timer: None,
            timer_generation: 0,
        };
        let (state_tx, _) = watch::channel(inner.snapshot());
        Self {
            api,
            clock: Arc::new(SystemClock),
            margin: Duration::from_secs(DEFAULT_EXPIRY_MARGIN_SECS),
            shared: Arc::new(Shared { inner: Mutex::new(inner), state_tx, store }),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    /// Manager talking HTTP to the configured auth service and persisting to
    /// `<state_dir>/session.json`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let api = HttpAuthApi::from_config(config)?;
        let store = FileTokenStore::new(&config.state_dir);
        Ok(Self::new(Arc::new(api), Arc::new(store)).with_expiry_margin(config.expiry_margin))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.shared.state_tx.borrow().clone()
    }

    /// Receiver that observes every published transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.shared.state_tx.subscribe()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.shared.lock().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.shared.lock().user.clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.shared.lock().phase
    }

    /// Absolute token expiry in epoch milliseconds.
    #[must_use]
    pub fn expires_at(&self) -> Option<u64> {
        self.shared.lock().expires_at
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.shared.lock().error.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.lock().loading
    }

    /// True when the most recent logout was triggered by token expiry.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.shared.lock().expired
    }

    /// True while a logout timer is armed.
    #[must_use]
    pub fn expiry_armed(&self) -> bool {
        self.shared.lock().timer.is_some()
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Restore a persisted session at startup.
    ///
    /// A stored expiry at or before now is treated as expired without
    /// contacting the server. Otherwise the user is fetched with the stored
    /// token; any failure logs out. Calling this while a session is already
    /// held is a no-op.
    pub async fn restore(&self) -> SessionPhase {
        let _gate = self.ops.lock().await;

        let (token, epoch) = {
            let mut inner = self.shared.lock();
            if inner.token.is_some() {
                return inner.phase;
            }
            let Some(persisted) = self.shared.store.load() else {
                inner.loading = false;
                self.shared.publish(&inner);
                return SessionPhase::Unauthenticated;
            };

            let now = self.clock.now_ms();
            if persisted.token_expiry <= now {
                info!("persisted session already expired");
                self.shared.logout_locked(&mut inner);
                self.shared.publish(&inner);
                return SessionPhase::Unauthenticated;
            }

            inner.token = Some(persisted.auth_token.clone());
            inner.expires_at = Some(persisted.token_expiry);
            inner.phase = SessionPhase::Resolving;
            inner.loading = true;
            if !self.arm_expiry(&mut inner, persisted.token_expiry, now) {
                self.shared.logout_locked(&mut inner);
                self.shared.publish(&inner);
                return SessionPhase::Unauthenticated;
            }
            self.shared.publish(&inner);
            (persisted.auth_token, inner.epoch)
        };

        let fetched = self.api.fetch_user(&token).await;

        let mut inner = self.shared.lock();
        if inner.epoch != epoch {
            return inner.phase;
        }
        match fetched {
            Ok(user) => {
                debug!(username = %user.username, "session restored");
                inner.user = Some(user);
                inner.phase = SessionPhase::Authenticated;
                inner.loading = false;
            }
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "could not resolve stored session; logging out");
                self.shared.logout_locked(&mut inner);
            }
        }
        self.shared.publish(&inner);
        inner.phase
    }

    /// Sign in. Returns the route to show next: the dashboard, or the login
    /// view if the issued token was already inside the expiry margin.
    ///
    /// # Errors
    ///
    /// Returns the auth service's rejection, a transport or malformed-response
    /// error, or a store failure. The session is left logged out and nothing
    /// is persisted.
    pub async fn login(&self, username: &str, password: &str) -> Result<Route, SessionError> {
        let _gate = self.ops.lock().await;
        let epoch = self.begin();
        let result = match self.api.login(username, password).await {
            Ok(grant) => self.start_session(epoch, grant).await,
            Err(e) => Err(e),
        };
        if result.is_ok() {
            info!(username, "login succeeded");
        }
        self.finish(result, "login")
    }

    /// Create an account and sign in to it. Same contract as [`SessionManager::login`].
    ///
    /// # Errors
    ///
    /// See [`SessionManager::login`].
    pub async fn register(&self, username: &str, password: &str, role: &str) -> Result<Route, SessionError> {
        let _gate = self.ops.lock().await;
        let epoch = self.begin();
        let result = match self.api.register(username, password, role).await {
            Ok(grant) => self.start_session(epoch, grant).await,
            Err(e) => Err(e),
        };
        if result.is_ok() {
            info!(username, role, "registration succeeded");
        }
        self.finish(result, "register")
    }

    /// Change the username and optionally the email on record.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unauthenticated`] without a token; otherwise the
    /// service's rejection or a transport error. The session is unchanged
    /// on failure.
    pub async fn update_user(&self, username: &str, email: Option<&str>) -> Result<Route, SessionError> {
        let update =
            ProfileUpdate { username: username.to_owned(), email: email.map(str::to_owned), password: None };
        self.apply_profile_update(update, "update_user").await
    }

    /// Change the username and password on record.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::update_user`].
    pub async fn change_password(&self, username: &str, password: &str) -> Result<Route, SessionError> {
        let update =
            ProfileUpdate { username: username.to_owned(), email: None, password: Some(password.to_owned()) };
        self.apply_profile_update(update, "change_password").await
    }

    /// Delete the signed-in account, then log out.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unauthenticated`] without a token; otherwise the
    /// service's rejection. The session stays signed in on failure.
    pub async fn delete_user(&self) -> Result<Route, SessionError> {
        let _gate = self.ops.lock().await;
        let token = self.require_token()?;
        let epoch = self.begin();
        let result = match self.api.delete_user(&token).await {
            Ok(()) if self.epoch() != epoch => Err(SessionError::Superseded),
            Ok(()) => {
                info!("account deleted");
                self.shared.logout();
                Ok(Route::Login)
            }
            Err(e) => Err(e),
        };
        self.finish(result, "delete_user")
    }

    /// Drop the session. Unconditional and idempotent.
    pub fn logout(&self) -> Route {
        self.shared.logout();
        Route::Login
    }

    /// Clear the error slot without touching anything else.
    pub fn clear_error(&self) {
        let mut inner = self.shared.lock();
        if inner.error.take().is_some() {
            self.shared.publish(&inner);
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn epoch(&self) -> u64 {
        self.shared.lock().epoch
    }

    /// Mark an operation as started: loading on, error cleared.
    fn begin(&self) -> u64 {
        let mut inner = self.shared.lock();
        inner.loading = true;
        inner.error = None;
        inner.expired = false;
        self.shared.publish(&inner);
        inner.epoch
    }

    /// Mark an operation as finished and record its failure, if any.
    fn finish(&self, result: Result<Route, SessionError>, operation: &'static str) -> Result<Route, SessionError> {
        let mut inner = self.shared.lock();
        inner.loading = false;
        match &result {
            Err(SessionError::Superseded) => {
                debug!(operation, "result dropped; session ended while in flight");
            }
            Err(e) => {
                warn!(operation, code = e.error_code(), error = %e, "session operation failed");
                inner.error = Some(e.user_message());
            }
            Ok(_) => {}
        }
        self.shared.publish(&inner);
        result
    }

    fn require_token(&self) -> Result<String, SessionError> {
        let mut inner = self.shared.lock();
        if let Some(token) = inner.token.clone() {
            return Ok(token);
        }
        inner.error = Some(SessionError::Unauthenticated.user_message());
        self.shared.publish(&inner);
        Err(SessionError::Unauthenticated)
    }

    /// Persist a freshly issued token, arm expiry, then resolve the user.
    async fn start_session(&self, epoch: u64, grant: TokenGrant) -> Result<Route, SessionError> {
        {
            let mut inner = self.shared.lock();
            if inner.epoch != epoch {
                return Err(SessionError::Superseded);
            }
            let now = self.clock.now_ms();
            let expires_at = now.saturating_add(grant.expires_in_ms);
            self.persist(&grant.token, expires_at)?;

            inner.token = Some(grant.token.clone());
            inner.expires_at = Some(expires_at);
            inner.user = None;
            inner.phase = SessionPhase::Resolving;
            if !self.arm_expiry(&mut inner, expires_at, now) {
                self.shared.logout_locked(&mut inner);
                self.shared.publish(&inner);
                return Ok(Route::Login);
            }
            self.shared.publish(&inner);
        }

        let fetched = self.api.fetch_user(&grant.token).await;

        let mut inner = self.shared.lock();
        if inner.epoch != epoch {
            return Err(SessionError::Superseded);
        }
        match fetched {
            Ok(user) => {
                inner.user = Some(user);
                inner.phase = SessionPhase::Authenticated;
                self.shared.publish(&inner);
                Ok(Route::Dashboard)
            }
            Err(e) => {
                self.shared.logout_locked(&mut inner);
                self.shared.publish(&inner);
                Err(e)
            }
        }
    }

    async fn apply_profile_update(
        &self,
        update: ProfileUpdate,
        operation: &'static str,
    ) -> Result<Route, SessionError> {
        let _gate = self.ops.lock().await;
        let token = self.require_token()?;
        let epoch = self.begin();
        let result = match self.api.update_user(&token, &update).await {
            Ok(grant) => self.accept_reissued(epoch, grant, &update),
            Err(e) => Err(e),
        };
        self.finish(result, operation)
    }

    /// Swap in a reissued token and replace the cached user record whole.
    fn accept_reissued(&self, epoch: u64, grant: TokenGrant, update: &ProfileUpdate) -> Result<Route, SessionError> {
        let mut inner = self.shared.lock();
        if inner.epoch != epoch {
            return Err(SessionError::Superseded);
        }
        let now = self.clock.now_ms();
        let expires_at = now.saturating_add(grant.expires_in_ms);
        self.persist(&grant.token, expires_at)?;

        inner.token = Some(grant.token);
        inner.expires_at = Some(expires_at);
        if let Some(current) = inner.user.take() {
            inner.phase = SessionPhase::Authenticated;
            inner.user = Some(User {
                username: grant.username.unwrap_or_else(|| update.username.clone()),
                email: grant.email.or_else(|| update.email.clone()).or(current.email),
                role: current.role,
            });
        }
        if !self.arm_expiry(&mut inner, expires_at, now) {
            self.shared.logout_locked(&mut inner);
            self.shared.publish(&inner);
            return Ok(Route::Login);
        }
        info!(username = ?inner.user.as_ref().map(|u| u.username.as_str()), "profile updated");
        self.shared.publish(&inner);
        Ok(Route::Profile)
    }

    fn persist(&self, token: &str, expires_at: u64) -> Result<(), SessionError> {
        self.shared
            .store
            .save(&PersistedToken { auth_token: token.to_owned(), token_expiry: expires_at })
    }

    /// Replace any armed timer with one firing at `expires_at - margin`.
    /// Returns `false` without arming when that instant is not in the future.
    fn arm_expiry(&self, inner: &mut Inner, expires_at: u64, now: u64) -> bool {
        inner.cancel_timer();
        let margin_ms = u64::try_from(self.margin.as_millis()).unwrap_or(u64::MAX);
        let deadline = expires_at.saturating_sub(margin_ms);
        if deadline <= now {
            debug!(expires_at, now, margin_ms, "token inside expiry margin");
            return false;
        }
        let delay = Duration::from_millis(deadline - now);
        let generation = inner.timer_generation;
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        debug!(delay_ms = deadline - now, "logout timer armed");
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if shared.begin_expiry(generation) {
                // Let subscribers see `Expiring` before it is replaced.
                tokio::task::yield_now().await;
                shared.expire(generation);
            }
        }));
        true
    }
}
