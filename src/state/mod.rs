pub mod auth;

pub use auth::{AuthState, SessionPhase};
