//! stratoform - declarative resource provider for the Stratos tenancy platform
//!
//! This crate translates declared resource blocks (customers, application
//! spaces, applications, tenants, agents, credentials, OAuth2 configuration,
//! policies, pipelines, trust score profiles) into calls against the Stratos
//! Config API, and the responses back into attribute state.
//!
//! # Architecture
//!
//! - [`schema`] - declarative attribute schemas built from shared fragments
//! - [`validate`] - pure format validators run at plan time
//! - [`diff`] - predicates that suppress server-side defaulting artifacts
//! - [`convert`] - optional-field adapters and response flattening
//! - [`state`] - the per-invocation attribute store with change tracking
//! - [`api`] - credentials, REST transport, and the typed Config API client
//! - [`resources`] - one CRUD handler module per resource type
//! - [`provider`] - the registry wiring type names to handlers
//!
//! The hosting declarative-infrastructure framework drives plan/apply and
//! owns persisted state; everything here is synchronous orchestration per
//! handler invocation, with the shared [`api::ConfigClient`] as the only
//! cross-invocation state.

pub mod api;
pub mod convert;
pub mod diag;
pub mod diff;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod state;
pub mod validate;

pub use provider::Provider;

/// Version injected at compile time via STRATOFORM_VERSION env var (set by
/// CI/CD), or the crate version for local builds.
pub const VERSION: &str = match option_env!("STRATOFORM_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
