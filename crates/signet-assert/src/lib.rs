//! Assertion wire codec.
//!
//! An assertion is a signed key/value document: a block of `name: value`
//! header lines, an optional opaque body, and an ed25519 signature over the
//! two. The grammar of one encoded document is:
//!
//! ```text
//! name: value          header lines; `type` is mandatory
//!                      blank line
//! <body bytes>         present iff the body-length header is > 0
//!                      blank line (only when a body is present)
//! <base64 signature>   one line
//! ```
//!
//! A stream carries one or more documents separated by a blank line. The
//! signed content is the header block plus, when a body is present, a blank
//! line and the body bytes.
//!
//! Key identifiers (`sign-key-sha3-384`, device-key fingerprints) are the
//! unpadded base64url SHA3-384 digest of the raw ed25519 public key.

mod assertion;
mod codec;
mod error;
mod kind;

use std::collections::BTreeMap;

pub use assertion::{assemble, key_id, sign, verify, Assertion};
pub use codec::{parse_key_values, Decoder};
pub use error::AssertionError;
pub use kind::AssertionKind;

/// Assertion headers, ordered by name.
pub type Headers = BTreeMap<String, String>;

/// HTTP media type for encoded assertions.
pub const MEDIA_TYPE: &str = "application/x.signet.assertion";
