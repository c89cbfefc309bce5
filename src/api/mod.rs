//! Stratos Config API access
//!
//! Credential loading, the REST transport, and the typed client shared by
//! every CRUD handler.

pub mod client;
pub mod credentials;
pub mod http;
pub mod models;

pub use client::ConfigClient;
pub use credentials::Credentials;
pub use http::ApiError;
