//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart upload admission with strict option validation
//! - Job status, cancellation and export download endpoints
//! - WebSocket progress subscriptions
//! - Prometheus metrics and ambient middleware

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
