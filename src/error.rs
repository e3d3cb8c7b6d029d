//! Error types for the session and catalog boundaries.
//!
//! ERROR HANDLING
//! ==============
//! Every failure crossing the HTTP boundary becomes a typed variant here.
//! The session manager converts them into a single human-readable message
//! for its error slot; callers that want more can match on the variant.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Fallback shown when a transport failure has no useful detail for users.
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to reach the server. Please try again.";

/// Message surfaced when an operation needs a token and none is held.
pub const UNAUTHENTICATED_MESSAGE: &str = "User not authenticated";

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code for logs and CLI output.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

// =============================================================================
// SESSION ERROR
// =============================================================================

/// Errors produced by session manager and auth API operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The auth service answered with a non-success status.
    /// `message` is the server's own text (or an operation default).
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// A success response did not carry the fields the operation needs.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The operation requires a token and none is held.
    #[error("User not authenticated")]
    Unauthenticated,

    /// The persisted token store could not be read or written.
    #[error("token store failed: {0}")]
    Store(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A logout happened while the call was in flight; its result was dropped.
    #[error("session ended before the request completed")]
    Superseded,
}

impl SessionError {
    /// Text written to the session error slot and shown inline in forms.
    ///
    /// Credential and validation failures are passed through verbatim;
    /// transport failures collapse into a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport(_) => NETWORK_ERROR_MESSAGE.to_owned(),
            Self::MalformedResponse(_) => "Unexpected response from the server".to_owned(),
            Self::Unauthenticated => UNAUTHENTICATED_MESSAGE.to_owned(),
            Self::Store(_) => "Unable to save the session on this device".to_owned(),
            Self::HttpClientBuild(_) => "An unexpected error occurred".to_owned(),
            Self::Superseded => "Session ended".to_owned(),
        }
    }

    /// HTTP status carried by a rejection, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected { status: 401 | 403, .. } => "E_UNAUTHORIZED",
            Self::Rejected { status: 409, .. } => "E_CONFLICT",
            Self::Rejected { .. } => "E_REJECTED",
            Self::Transport(_) => "E_TRANSPORT",
            Self::MalformedResponse(_) => "E_MALFORMED_RESPONSE",
            Self::Unauthenticated => "E_UNAUTHENTICATED",
            Self::Store(_) => "E_STORE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Superseded => "E_SUPERSEDED",
        }
    }
}

// =============================================================================
// CATALOG ERROR
// =============================================================================

/// Errors produced by the movie catalog and watchlist client.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The HTTP request to the catalog service failed.
    #[error("catalog request failed: {0}")]
    Request(String),

    /// The catalog service returned a non-success HTTP status.
    #[error("catalog response error: status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("catalog response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The configured base URL is not an absolute http(s) URL.
    #[error("invalid catalog base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_CATALOG_REQUEST",
            Self::Status { .. } => "E_CATALOG_STATUS",
            Self::Parse(_) => "E_CATALOG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::InvalidBaseUrl(_) => "E_CATALOG_BASE_URL",
        }
    }
}
