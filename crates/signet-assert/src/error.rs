//! Codec error types.

use thiserror::Error;

/// Errors raised while decoding, assembling, or signing assertions.
#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("Malformed header line: {0}")]
    Header(String),

    #[error("Duplicate header: {0}")]
    DuplicateHeader(String),

    #[error("Assertion has no type header")]
    MissingType,

    #[error("Unknown assertion type: {0}")]
    UnknownKind(String),

    #[error("Invalid body-length header: {0}")]
    BodyLength(String),

    #[error("Truncated body: expected {expected} bytes, got {actual}")]
    TruncatedBody { expected: usize, actual: usize },

    #[error("Missing separator after body")]
    MissingBodySeparator,

    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Invalid signing key: {0}")]
    SigningKey(String),

    #[error("Signature verification failed")]
    Verification,
}
