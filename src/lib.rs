//! # Identity Agent Library
//!
//! Provides functionality for fetching a managed identity credential from
//! a cloud metadata endpoint, validating it, and keeping it refreshed in
//! the background for dependent clients.
//!
//! Modules:
//! - `config` — endpoint environment capture and service settings
//! - `credential` — the bearer credential value
//! - `fetcher` — injectable HTTP transport capability
//! - `sources` — the managed identity fetch operation
//! - `refresh` — background refresh scheduler

pub mod config;
pub mod credential;
pub mod error;
pub mod fetcher;
pub mod helpers;
pub mod refresh;
pub mod resilience;
pub mod sources;
pub mod tests;
pub mod utils;


pub use crate::credential::Credential;
pub use crate::error::IdentityError;
pub use crate::fetcher::{Fetcher, HttpFetcher};
pub use crate::refresh::{RefreshHandle, RefreshScheduler};
pub use crate::sources::managed_identity::fetch_credential;
