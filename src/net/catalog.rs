//! Movie catalog and watchlist client.
//!
//! The catalog backend is external; this is a thin typed wrapper over its
//! REST surface. Calls that address a single resource return `Ok(None)` on
//! 404 so views can render "not found" without matching on errors.

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;

use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::types::{Movie, MovieDetails, WatchStatus, WatchlistEntry};
use crate::config::{HttpTimeouts, SessionConfig};
use crate::error::CatalogError;

const MOVIES_PATH: &[&str] = &["api", "movie-catalog", "movies"];
const WATCHLIST_PATH: &[&str] = &["api", "watchlist", "movies"];

pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl CatalogClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidBaseUrl`] if `base_url` cannot carry a
    /// path, or [`CatalogError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, CatalogError> {
        let parsed = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| CatalogError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(CatalogError::InvalidBaseUrl(base_url.to_owned()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| CatalogError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: parsed, token: None })
    }

    /// # Errors
    ///
    /// See [`CatalogClient::new`].
    pub fn from_config(config: &SessionConfig) -> Result<Self, CatalogError> {
        Self::new(&config.catalog_url, config.timeouts)
    }

    /// Attach the session's bearer token to every subsequent request.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    // =========================================================================
    // MOVIES
    // =========================================================================

    /// `GET /api/movie-catalog/movies/popular?page=N`
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport, status, or decode failure.
    pub async fn popular_movies(&self, page: u32) -> Result<Vec<Movie>, CatalogError> {
        let request = self
            .request(Method::GET, MOVIES_PATH, &["popular"])
            .query(&[("page", page)]);
        send_json(request).await
    }

    /// `GET /api/movie-catalog/movies/{id}`; `None` when the catalog has no such movie.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport, non-404 status, or decode failure.
    pub async fn movie_details(&self, id: u64) -> Result<Option<MovieDetails>, CatalogError> {
        let request = self.request(Method::GET, MOVIES_PATH, &[&id.to_string()]);
        send_json_optional(request).await
    }

    /// `GET /api/movie-catalog/movies/search?query=Q&page=N`
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport, status, or decode failure.
    pub async fn search_movies(&self, query: &str, page: u32) -> Result<Vec<Movie>, CatalogError> {
        let page = page.to_string();
        let request = self
            .request(Method::GET, MOVIES_PATH, &["search"])
            .query(&[("query", query), ("page", page.as_str())]);
        send_json(request).await
    }

    // =========================================================================
    // WATCHLIST
    // =========================================================================

    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport, status, or decode failure.
    pub async fn movie_watchlist(&self, username: &str) -> Result<Vec<WatchlistEntry>, CatalogError> {
        let request = self.request(Method::GET, WATCHLIST_PATH, &[username]);
        send_json(request).await
    }

    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport, status, or decode failure.
    pub async fn add_to_watchlist(
        &self,
        username: &str,
        movie_id: &str,
        status: WatchStatus,
    ) -> Result<WatchlistEntry, CatalogError> {
        let entry = WatchlistEntry {
            id: None,
            username: username.to_owned(),
            movie_id: movie_id.to_owned(),
            status,
            created_at: None,
            updated_at: None,
        };
        let request = self.request(Method::POST, WATCHLIST_PATH, &[]).json(&entry);
        send_json(request).await
    }

    /// `None` when the movie is not on the user's watchlist.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport, non-404 status, or decode failure.
    pub async fn update_watch_status(
        &self,
        username: &str,
        movie_id: &str,
        status: WatchStatus,
    ) -> Result<Option<WatchlistEntry>, CatalogError> {
        let request = self
            .request(Method::PUT, WATCHLIST_PATH, &[username, movie_id])
            .json(&serde_json::json!({ "status": status }));
        send_json_optional(request).await
    }

    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport or status failure.
    pub async fn remove_from_watchlist(&self, username: &str, movie_id: &str) -> Result<(), CatalogError> {
        let request = self.request(Method::DELETE, WATCHLIST_PATH, &[username, movie_id]);
        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status: status.as_u16(), body });
        }
        Ok(())
    }

    /// Request to `base_url` joined with `prefix` then `segments`. Each
    /// segment is percent-encoded, so `/`, `?` and `#` stay inside it.
    fn request(&self, method: Method, prefix: &[&str], segments: &[&str]) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(prefix, segments));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn endpoint(&self, prefix: &[&str], segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(prefix).extend(segments);
        }
        url
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, CatalogError> {
    send_json_optional(request)
        .await?
        .ok_or(CatalogError::Status { status: StatusCode::NOT_FOUND.as_u16(), body: String::new() })
}

async fn send_json_optional<T: DeserializeOwned>(request: RequestBuilder) -> Result<Option<T>, CatalogError> {
    let response = request
        .send()
        .await
        .map_err(|e| CatalogError::Request(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| CatalogError::Request(e.to_string()))?;

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), "catalog request failed");
        return Err(CatalogError::Status { status: status.as_u16(), body: text });
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| CatalogError::Parse(e.to_string()))
}
