// Test code patterns:
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Convene API Server
//!
//! HTTP entry point for the payment reconciliation pipeline: receives
//! gateway "payment succeeded" callbacks and hands them to the notify
//! crate.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
