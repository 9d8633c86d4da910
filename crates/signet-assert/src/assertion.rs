//! The decoded assertion and the operations that produce new ones.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha3::{Digest, Sha3_384};

use crate::codec::{encode_into, serialize_content};
use crate::error::AssertionError;
use crate::kind::AssertionKind;
use crate::Headers;

/// A decoded assertion document.
#[derive(Debug, Clone)]
pub struct Assertion {
    kind: AssertionKind,
    headers: Headers,
    body: Vec<u8>,
    content: Vec<u8>,
    signature: Vec<u8>,
}

impl Assertion {
    pub(crate) fn from_parts(
        kind: AssertionKind,
        headers: Headers,
        body: Vec<u8>,
        content: Vec<u8>,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            kind,
            headers,
            body,
            content,
            signature,
        }
    }

    pub fn kind(&self) -> AssertionKind {
        self.kind
    }

    /// Look up a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The exact bytes covered by the signature.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The fingerprint of the key that signed this assertion.
    pub fn sign_key_id(&self) -> Option<&str> {
        self.header("sign-key-sha3-384")
    }

    /// Re-emit the assertion in wire form.
    ///
    /// The header block is re-serialized canonically (type first, remaining
    /// headers by name), so an assembled assertion carries its overridden
    /// headers even though its signature still covers the previous content.
    pub fn encode(&self) -> Vec<u8> {
        let content = serialize_content(self.kind, &self.headers, &self.body);
        let mut out = Vec::with_capacity(content.len() + self.signature.len() * 2 + 4);
        encode_into(&mut out, &content, &self.signature);
        out
    }
}

/// Build an assertion from headers and body, re-using an existing signature
/// and the content it covers.
///
/// Used to carry a device's self-signed serial-request forward while the
/// derived serial assertion is constructed; the authority's own signature is
/// applied afterwards by the keystore.
pub fn assemble(
    headers: Headers,
    body: Vec<u8>,
    previous_content: Vec<u8>,
    previous_signature: Vec<u8>,
) -> Result<Assertion, AssertionError> {
    let type_name = headers.get("type").ok_or(AssertionError::MissingType)?;
    let kind = AssertionKind::from_name(type_name)
        .ok_or_else(|| AssertionError::UnknownKind(type_name.clone()))?;
    if previous_signature.is_empty() {
        return Err(AssertionError::Signature("empty signature".into()));
    }
    Ok(Assertion {
        kind,
        headers,
        body,
        content: previous_content,
        signature: previous_signature,
    })
}

/// Serialize and sign an assertion, returning its encoded wire form.
pub fn sign(
    kind: AssertionKind,
    headers: &Headers,
    body: &[u8],
    signing_key: &SigningKey,
) -> Result<Vec<u8>, AssertionError> {
    let content = serialize_content(kind, headers, body);
    let signature: Signature = signing_key.sign(&content);
    let mut out = Vec::with_capacity(content.len() + 96);
    encode_into(&mut out, &content, &signature.to_bytes());
    Ok(out)
}

/// Verify an assertion's signature against a public key.
pub fn verify(assertion: &Assertion, verifying_key: &VerifyingKey) -> Result<(), AssertionError> {
    let signature = Signature::from_slice(assertion.signature())
        .map_err(|e| AssertionError::Signature(e.to_string()))?;
    verifying_key
        .verify(assertion.content(), &signature)
        .map_err(|_| AssertionError::Verification)
}

/// The public identifier of a signing key: unpadded base64url of the
/// SHA3-384 digest of the raw public key bytes.
pub fn key_id(verifying_key: &VerifyingKey) -> String {
    let digest = Sha3_384::digest(verifying_key.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use rand::RngCore;

    use super::*;
    use crate::Decoder;

    fn test_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn request_headers(body: &[u8]) -> Headers {
        let mut headers = Headers::new();
        headers.insert("type".into(), "serial-request".into());
        headers.insert("brand-id".into(), "acme".into());
        headers.insert("model".into(), "rpi".into());
        headers.insert("serial".into(), "SN1".into());
        if !body.is_empty() {
            headers.insert("body-length".into(), body.len().to_string());
        }
        headers
    }

    #[test]
    fn sign_then_decode_round_trips_headers_and_body() {
        let key = test_key();
        let body = b"extra: data";
        let headers = request_headers(body);

        let encoded = sign(AssertionKind::SerialRequest, &headers, body, &key).unwrap();
        let decoded = Decoder::new(&encoded).decode().unwrap().unwrap();

        assert_eq!(decoded.kind(), AssertionKind::SerialRequest);
        assert_eq!(decoded.headers(), &headers);
        assert_eq!(decoded.body(), body);
        verify(&decoded, &key.verifying_key()).unwrap();
    }

    #[test]
    fn encode_is_byte_identical_after_decode() {
        let key = test_key();
        let headers = request_headers(b"");
        let encoded = sign(AssertionKind::SerialRequest, &headers, b"", &key).unwrap();

        let decoded = Decoder::new(&encoded).decode().unwrap().unwrap();
        assert_eq!(decoded.encode(), encoded);
    }

    #[test]
    fn assemble_preserves_previous_signature() {
        let key = test_key();
        let body = b"serial: SN1";
        let req_headers = request_headers(body);
        let encoded = sign(AssertionKind::SerialRequest, &req_headers, body, &key).unwrap();
        let request = Decoder::new(&encoded).decode().unwrap().unwrap();

        let mut headers = request.headers().clone();
        headers.insert("type".into(), "serial".into());
        headers.insert("authority-id".into(), "acme".into());

        let serial = assemble(
            headers.clone(),
            request.body().to_vec(),
            request.content().to_vec(),
            request.signature().to_vec(),
        )
        .unwrap();

        assert_eq!(serial.kind(), AssertionKind::Serial);
        assert_eq!(serial.signature(), request.signature());
        assert_eq!(serial.content(), request.content());
        assert_eq!(serial.header("authority-id"), Some("acme"));

        // Re-encoding and re-decoding preserves header and body values,
        // including the overridden type and the added authority-id.
        let re = Decoder::new(&serial.encode()).decode().unwrap().unwrap();
        assert_eq!(re.kind(), AssertionKind::Serial);
        assert_eq!(re.headers(), serial.headers());
        assert_eq!(re.body(), serial.body());
        assert_eq!(re.signature(), serial.signature());
    }

    #[test]
    fn assemble_rejects_missing_type() {
        let headers = Headers::new();
        assert!(matches!(
            assemble(headers, Vec::new(), Vec::new(), b"sig".to_vec()),
            Err(AssertionError::MissingType)
        ));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let key = test_key();
        let other = test_key();
        let headers = request_headers(b"");
        let encoded = sign(AssertionKind::SerialRequest, &headers, b"", &key).unwrap();
        let decoded = Decoder::new(&encoded).decode().unwrap().unwrap();

        assert!(matches!(
            verify(&decoded, &other.verifying_key()),
            Err(AssertionError::Verification)
        ));
    }

    #[test]
    fn key_id_is_stable_and_url_safe() {
        let key = test_key();
        let id1 = key_id(&key.verifying_key());
        let id2 = key_id(&key.verifying_key());
        assert_eq!(id1, id2);
        // SHA3-384 = 48 bytes = 64 base64 chars, unpadded
        assert_eq!(id1.len(), 64);
        assert!(!id1.contains('='));
        assert!(!id1.contains('+'));
        assert!(!id1.contains('/'));
    }
}
