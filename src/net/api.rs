//! REST client for the external auth service.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session manager talks to the auth backend only through [`AuthApi`],
//! so tests can script responses without a network. [`HttpAuthApi`] is the
//! production implementation over `reqwest`.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx statuses become [`SessionError::Rejected`] carrying the server's
//! `message` when it sent one, else a per-operation default. Bodies that
//! decode but lack required fields become `MalformedResponse`.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::Method;
use serde::Serialize;

use super::types::{ErrorBody, LoginRequest, ProfileUpdate, RegisterRequest, TokenGrant, User, UserEnvelope};
use crate::config::{HttpTimeouts, SessionConfig};
use crate::error::SessionError;

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const USER_PATH: &str = "/api/auth/user";

const LOGIN_FAILED: &str = "Login failed";
const REGISTER_FAILED: &str = "Registration failed";
const FETCH_USER_FAILED: &str = "Failed to fetch user details";
const UPDATE_USER_FAILED: &str = "Failed to update user";
const DELETE_USER_FAILED: &str = "Failed to delete user";

// =============================================================================
// AUTH API TRAIT
// =============================================================================

/// The five calls the session manager makes against the auth service.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] for bad credentials, or a transport
    /// or malformed-response error.
    async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, SessionError>;

    /// Create an account and receive its first token.
    ///
    /// # Errors
    ///
    /// Same as [`AuthApi::login`].
    async fn register(&self, username: &str, password: &str, role: &str) -> Result<TokenGrant, SessionError>;

    /// Resolve the profile that owns `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] when the token is refused.
    async fn fetch_user(&self, token: &str) -> Result<User, SessionError>;

    /// Change profile fields. The service reissues the token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] on conflict or validation failure.
    async fn update_user(&self, token: &str, update: &ProfileUpdate) -> Result<TokenGrant, SessionError>;

    /// Delete the account that owns `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] when the service refuses.
    async fn delete_user(&self, token: &str) -> Result<(), SessionError>;
}

// =============================================================================
// HTTP IMPLEMENTATION
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Build a client for the auth service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if the TLS backend fails to
    /// initialize.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| SessionError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// # Errors
    ///
    /// See [`HttpAuthApi::new`].
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::new(&config.auth_url, config.timeouts)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&(impl Serialize + Sync)>,
        fallback: &str,
    ) -> Result<String, SessionError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            tracing::debug!(%method, path, status, "auth service rejected request");
            return Err(rejection(status, &text, fallback));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, SessionError> {
        let body = LoginRequest { username, password };
        let text = self
            .send(Method::POST, LOGIN_PATH, None, Some(&body), LOGIN_FAILED)
            .await?;
        parse_grant(&text)
    }

    async fn register(&self, username: &str, password: &str, role: &str) -> Result<TokenGrant, SessionError> {
        let body = RegisterRequest { username, password, role };
        let text = self
            .send(Method::POST, REGISTER_PATH, None, Some(&body), REGISTER_FAILED)
            .await?;
        parse_grant(&text)
    }

    async fn fetch_user(&self, token: &str) -> Result<User, SessionError> {
        let text = self
            .send(Method::GET, USER_PATH, Some(token), None::<&()>, FETCH_USER_FAILED)
            .await?;
        let envelope: UserEnvelope =
            serde_json::from_str(&text).map_err(|e| SessionError::MalformedResponse(e.to_string()))?;
        Ok(envelope.user)
    }

    async fn update_user(&self, token: &str, update: &ProfileUpdate) -> Result<TokenGrant, SessionError> {
        let text = self
            .send(Method::PUT, USER_PATH, Some(token), Some(update), UPDATE_USER_FAILED)
            .await?;
        let grant = parse_grant(&text)?;
        if grant.username.as_deref().is_none_or(str::is_empty) {
            return Err(SessionError::MalformedResponse("update response missing username".into()));
        }
        Ok(grant)
    }

    async fn delete_user(&self, token: &str) -> Result<(), SessionError> {
        self.send(Method::DELETE, USER_PATH, Some(token), None::<&()>, DELETE_USER_FAILED)
            .await?;
        Ok(())
    }
}

// =============================================================================
// RESPONSE HELPERS
// =============================================================================

/// Build a rejection from a non-2xx body. Prefers the server's `message`,
/// then its `error` reason phrase, then `fallback`.
pub(crate) fn rejection(status: u16, body: &str, fallback: &str) -> SessionError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| parsed.error.filter(|e| !e.trim().is_empty()))
        .unwrap_or_else(|| fallback.to_owned());
    SessionError::Rejected { status, message }
}

/// Decode a token grant, refusing an empty token.
pub(crate) fn parse_grant(body: &str) -> Result<TokenGrant, SessionError> {
    let grant: TokenGrant =
        serde_json::from_str(body).map_err(|e| SessionError::MalformedResponse(e.to_string()))?;
    if grant.token.is_empty() {
        return Err(SessionError::MalformedResponse("empty token".into()));
    }
    Ok(grant)
}
