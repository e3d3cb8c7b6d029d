//! HTTP boundary: auth service, catalog service, and their wire types.

pub mod api;
pub mod catalog;
pub mod types;

pub use api::{AuthApi, HttpAuthApi};
pub use catalog::CatalogClient;
