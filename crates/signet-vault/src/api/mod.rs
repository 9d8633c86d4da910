//! HTTP API for the signing service.

mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::env::Env;

pub use handlers::{ErrorResponse, RequestIdResponse, TestLogRequest};

/// Build the service router over an injected environment.
pub fn build_router(env: Env) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/request-id", post(handlers::request_id))
        .route("/serial", post(handlers::serial))
        .route("/testlog", post(handlers::test_log))
        .with_state(env)
}
