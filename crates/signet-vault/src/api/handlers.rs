//! Signing endpoint handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use signet_assert::MEDIA_TYPE;

use crate::env::Env;
use crate::error::SignError;
use crate::sign;

/// JSON response for `POST /request-id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestIdResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "request-id")]
    pub request_id: String,
}

/// JSON error envelope for failed signing calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
}

impl IntoResponse for SignError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// The opaque model API key presented in the `api-key` header.
fn api_key(headers: &HeaderMap) -> &str {
    headers
        .get("api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

/// `POST /request-id` — issue a nonce for a signing call.
pub async fn request_id(State(env): State<Env>, headers: HeaderMap) -> Response {
    match sign::request_id(&env, api_key(&headers)).await {
        Ok(nonce) => Json(RequestIdResponse {
            success: true,
            message: String::new(),
            request_id: nonce,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /serial` — sign a serial-request assertion stream.
pub async fn serial(State(env): State<Env>, headers: HeaderMap, body: Bytes) -> Response {
    match sign::sign_serial(&env, api_key(&headers), &body).await {
        Ok(signed) => (
            StatusCode::OK,
            [("content-type", MEDIA_TYPE)],
            signed,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// JSON request body for `POST /testlog`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TestLogRequest {
    #[serde(rename = "brand-id")]
    pub brand_id: String,
    pub model: String,
    pub filename: String,
    /// Base64-encoded artifact contents.
    pub data: String,
}

/// `POST /testlog` — store a factory test artifact for later upload.
pub async fn test_log(
    State(env): State<Env>,
    headers: HeaderMap,
    Json(req): Json<TestLogRequest>,
) -> Response {
    match sign::store_test_log(&env, api_key(&headers), &req).await {
        Ok(()) => Json(serde_json::json!({"success": true, "message": ""})).into_response(),
        Err(e) => e.into_response(),
    }
}
