//! HTTP request handlers.

pub mod jobs;
pub mod upload;

use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "autocut-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
