//! CineTracks session client.
//!
//! SYSTEM CONTEXT
//! ==============
//! CineTracks is a movie browsing app with accounts and a personal
//! watchlist. Authentication and catalog data live in external services;
//! this crate is the client side of both.
//!
//! ARCHITECTURE
//! ============
//! - [`session::SessionManager`] owns the bearer token, its expiry, and the
//!   signed-in user. It persists through a [`store::TokenStore`] and logs
//!   out on its own shortly before the token expires.
//! - [`net::api`] is the auth service client, behind the [`net::AuthApi`]
//!   trait.
//! - [`net::catalog`] reads movies and edits the watchlist using the
//!   session's token.
//! - [`state::auth`] and [`routes`] are what views consume: a state snapshot
//!   and redirect guards.

pub mod clock;
pub mod config;
pub mod error;
pub mod net;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

pub use config::SessionConfig;
pub use error::{CatalogError, ErrorCode, SessionError};
pub use net::{AuthApi, CatalogClient, HttpAuthApi};
pub use routes::Route;
pub use session::SessionManager;
pub use state::{AuthState, SessionPhase};
pub use store::{FileTokenStore, MemoryTokenStore, PersistedToken, TokenStore};
