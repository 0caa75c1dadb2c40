//! HTTP query surface.
//!
//! Exposes the pipeline over axum:
//!
//! - `POST /api/v1/users/query` runs one query and returns the record array
//! - `GET /health` reports liveness and version
//! - `GET /health/ready` pings the record store

pub mod routes;
pub mod transport;

pub use routes::{AppState, ApiError, router, status_for};
pub use transport::serve;
