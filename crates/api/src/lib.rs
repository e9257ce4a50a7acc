//! Typed HTTP client for the Jalon backend — the authoritative system of
//! record for the project hierarchy, staffing invitations, and milestone
//! membership.
//!
//! The governance layer talks to the backend exclusively through the
//! [`Backend`] trait so that tests can substitute an in-memory double;
//! [`ApiClient`] is the production `reqwest` implementation.

pub mod backend;
pub mod client;
pub mod config;
pub mod dto;
pub mod error;

pub use backend::Backend;
pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::ApiError;
