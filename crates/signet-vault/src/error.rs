//! The signing pipeline error taxonomy.
//!
//! Each pipeline step returns one kind upward; the API boundary maps kinds
//! to HTTP statuses (4xx for client-caused failures, 5xx when assembly,
//! signing, or logging fails server-side).

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("Invalid API key used")]
    InvalidApiKey,

    #[error("Error decoding the assertion: {0}")]
    InvalidAssertion(String),

    #[error("No data supplied for signing")]
    EmptyData,

    #[error("The assertion type must be 'serial-request'")]
    InvalidType,

    #[error("The second assertion type must be 'model'")]
    InvalidSecondType,

    #[error("Model and serial-request assertion do not match")]
    MismatchedModel,

    #[error("Nonce is invalid, expired or already used")]
    InvalidNonce,

    #[error("Error generating the request-id")]
    GenerateNonce,

    #[error("Cannot find model with the matching brand and model")]
    InvalidModel,

    #[error("Cannot find sub-store model for the brand, model and serial")]
    InvalidModelSubstore,

    #[error("The model is linked with an inactive signing-key")]
    InactiveModel,

    #[error("The serial is missing from both the header and the body")]
    EmptySerial,

    #[error("Error creating the serial assertion: {0}")]
    CreateAssertion(String),

    #[error("Error signing the serial assertion: {0}")]
    SigningAssertion(String),

    #[error("Error logging the signed assertion: {0}")]
    LoggingAssertion(String),
}

impl SignError {
    /// The stable error code reported in the response envelope and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidApiKey => "invalid-api-key",
            Self::InvalidAssertion(_) => "invalid-assertion",
            Self::EmptyData => "empty-data",
            Self::InvalidType => "invalid-type",
            Self::InvalidSecondType => "invalid-second-type",
            Self::MismatchedModel => "mismatched-model",
            Self::InvalidNonce => "invalid-nonce",
            Self::GenerateNonce => "generate-request-id",
            Self::InvalidModel => "invalid-model",
            Self::InvalidModelSubstore => "invalid-model-substore",
            Self::InactiveModel => "inactive-model",
            Self::EmptySerial => "empty-serial",
            Self::CreateAssertion(_) => "create-assertion",
            Self::SigningAssertion(_) => "signing-assertion",
            Self::LoggingAssertion(_) => "logging-assertion",
        }
    }

    /// The HTTP status the API boundary responds with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidApiKey
            | Self::InvalidAssertion(_)
            | Self::EmptyData
            | Self::InvalidType
            | Self::InvalidSecondType
            | Self::MismatchedModel
            | Self::InvalidNonce
            | Self::InvalidModel
            | Self::InvalidModelSubstore
            | Self::InactiveModel
            | Self::EmptySerial => StatusCode::BAD_REQUEST,
            Self::GenerateNonce
            | Self::CreateAssertion(_)
            | Self::SigningAssertion(_)
            | Self::LoggingAssertion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(SignError::InvalidNonce.status(), StatusCode::BAD_REQUEST);
        assert_eq!(SignError::EmptySerial.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_errors_map_to_500() {
        assert_eq!(
            SignError::SigningAssertion("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            SignError::LoggingAssertion("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(SignError::InvalidModelSubstore.code(), "invalid-model-substore");
        assert_eq!(SignError::MismatchedModel.code(), "mismatched-model");
    }
}
