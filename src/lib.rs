//! idcontrol - Document verification back-office client
//!
//! This crate provides a resilient HTTP request engine and the API client
//! built on it for the document-verification back office.
//!
//! # Overview
//!
//! Every call to the verification API goes through [`HttpClient`], which
//! bounds each attempt with a timeout, retries network failures and 5xx
//! answers with exponential backoff, and keeps a circuit breaker per
//! `(method, origin, path)`. Calls never fail with an error: every outcome is
//! a [`client::Response`] carrying a status code and, on failure, a message.
//!
//! # Modules
//!
//! - [`client`] - Request engine (retry, timeout, circuit breaker)
//! - [`api`] - Back-office API operations
//! - [`server`] - Health endpoint
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Configuration file parsing and validation
//! - [`error`] - Error types and error handling

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod server;

// Re-exports for convenience
pub use api::ApiClient;
pub use cli::Cli;
pub use client::{HttpClient, Response};
pub use config::Config;
pub use error::{IdControlError, Result};
pub use server::serve;
