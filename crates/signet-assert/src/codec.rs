//! Streaming decoder for the assertion wire format.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::assertion::Assertion;
use crate::error::AssertionError;
use crate::kind::AssertionKind;
use crate::Headers;

/// Decodes a byte stream of one or more concatenated assertion documents.
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Decode the next assertion in the stream.
    ///
    /// Returns `Ok(None)` when the stream is exhausted.
    pub fn decode(&mut self) -> Result<Option<Assertion>, AssertionError> {
        // Skip the blank separation between documents (and trailing newlines).
        while self.pos < self.input.len() && self.input[self.pos] == b'\n' {
            self.pos += 1;
        }
        if self.pos >= self.input.len() {
            return Ok(None);
        }

        let headers_start = self.pos;
        let mut headers_end = self.pos;
        let mut headers = Headers::new();

        loop {
            let line = self.read_line();
            if line.is_empty() {
                break;
            }
            let (name, value) = parse_header_line(line)?;
            if headers.insert(name.clone(), value).is_some() {
                return Err(AssertionError::DuplicateHeader(name));
            }
            // End of the last header line, exclusive of its newline.
            headers_end = self.pos.min(self.input.len());
            if self.input.get(headers_end.wrapping_sub(1)) == Some(&b'\n') {
                headers_end -= 1;
            }
        }

        let type_name = headers
            .get("type")
            .ok_or(AssertionError::MissingType)?
            .clone();
        let kind = AssertionKind::from_name(&type_name)
            .ok_or_else(|| AssertionError::UnknownKind(type_name))?;

        let body_len = match headers.get("body-length") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| AssertionError::BodyLength(v.clone()))?,
            None => 0,
        };

        let (body, content_end) = if body_len > 0 {
            let body_start = self.pos;
            let body_end = body_start + body_len;
            if body_end > self.input.len() {
                return Err(AssertionError::TruncatedBody {
                    expected: body_len,
                    actual: self.input.len() - body_start,
                });
            }
            self.pos = body_end;
            if self.input.get(self.pos) != Some(&b'\n')
                || self.input.get(self.pos + 1) != Some(&b'\n')
            {
                return Err(AssertionError::MissingBodySeparator);
            }
            self.pos += 2;
            (self.input[body_start..body_end].to_vec(), body_end)
        } else {
            (Vec::new(), headers_end)
        };

        let sig_line = self.read_line();
        if sig_line.is_empty() {
            return Err(AssertionError::Signature("empty signature".into()));
        }
        let signature = STANDARD
            .decode(sig_line)
            .map_err(|e| AssertionError::Signature(e.to_string()))?;

        let content = self.input[headers_start..content_end].to_vec();

        Ok(Some(Assertion::from_parts(
            kind, headers, body, content, signature,
        )))
    }

    /// Read bytes up to (but not including) the next newline; consumes the
    /// newline. Returns an empty slice for a blank line or at end of input.
    fn read_line(&mut self) -> &'a [u8] {
        let input = self.input;
        let start = self.pos;
        while self.pos < input.len() && input[self.pos] != b'\n' {
            self.pos += 1;
        }
        let line = &input[start..self.pos];
        if self.pos < input.len() {
            self.pos += 1;
        }
        line
    }
}

/// Split a header line into name and value.
fn parse_header_line(line: &[u8]) -> Result<(String, String), AssertionError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| AssertionError::Header("non-utf8 header line".into()))?;
    let Some((name, value)) = text.split_once(": ") else {
        return Err(AssertionError::Header(text.to_string()));
    };
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(AssertionError::Header(text.to_string()));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Leniently parse a flat `name: value` document, such as an assertion body.
///
/// Malformed lines are skipped rather than rejected; the caller treats the
/// result as best-effort extra headers.
pub fn parse_key_values(input: &[u8]) -> Headers {
    let mut out = Headers::new();
    let Ok(text) = std::str::from_utf8(input) else {
        return out;
    };
    for line in text.lines() {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if !name.is_empty() {
                out.insert(name.to_string(), value.to_string());
            }
        }
    }
    out
}

/// Serialize the signed content for an assertion: the header block (type
/// first, remaining headers by name) plus the body when present.
pub(crate) fn serialize_content(kind: AssertionKind, headers: &Headers, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"type: ");
    out.extend_from_slice(kind.name().as_bytes());
    for (name, value) in headers {
        if name == "type" {
            continue;
        }
        out.push(b'\n');
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
    }
    if !body.is_empty() {
        out.extend_from_slice(b"\n\n");
        out.extend_from_slice(body);
    }
    out
}

/// Append the encoded form of (content, signature) to `out`.
pub(crate) fn encode_into(out: &mut Vec<u8>, content: &[u8], signature: &[u8]) {
    out.extend_from_slice(content);
    out.extend_from_slice(b"\n\n");
    out.extend_from_slice(STANDARD.encode(signature).as_bytes());
    out.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(headers: &str, body: Option<&str>, sig: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(headers.as_bytes());
        if let Some(b) = body {
            out.extend_from_slice(b"\n\n");
            out.extend_from_slice(b.as_bytes());
        }
        out.extend_from_slice(b"\n\n");
        out.extend_from_slice(STANDARD.encode(sig).as_bytes());
        out.push(b'\n');
        out
    }

    #[test]
    fn decode_single_assertion_without_body() {
        let data = doc("type: model\nbrand-id: acme\nmodel: rpi", None, b"sig");
        let mut dec = Decoder::new(&data);
        let a = dec.decode().unwrap().unwrap();
        assert_eq!(a.kind(), AssertionKind::Model);
        assert_eq!(a.header("brand-id"), Some("acme"));
        assert!(a.body().is_empty());
        assert_eq!(a.signature(), b"sig");
        assert!(dec.decode().unwrap().is_none());
    }

    #[test]
    fn decode_assertion_with_body() {
        let data = doc(
            "type: serial-request\nbrand-id: acme\nbody-length: 11",
            Some("serial: SN1"),
            b"sig",
        );
        let mut dec = Decoder::new(&data);
        let a = dec.decode().unwrap().unwrap();
        assert_eq!(a.body(), b"serial: SN1");
        assert!(a.content().ends_with(b"serial: SN1"));
        assert!(dec.decode().unwrap().is_none());
    }

    #[test]
    fn decode_two_concatenated_assertions() {
        let mut data = doc("type: serial-request\nbrand-id: acme", None, b"s1");
        data.push(b'\n');
        data.extend_from_slice(&doc("type: model\nbrand-id: acme", None, b"s2"));

        let mut dec = Decoder::new(&data);
        assert_eq!(
            dec.decode().unwrap().unwrap().kind(),
            AssertionKind::SerialRequest
        );
        assert_eq!(dec.decode().unwrap().unwrap().kind(), AssertionKind::Model);
        assert!(dec.decode().unwrap().is_none());
    }

    #[test]
    fn empty_stream_decodes_to_none() {
        assert!(Decoder::new(b"").decode().unwrap().is_none());
        assert!(Decoder::new(b"\n\n").decode().unwrap().is_none());
    }

    #[test]
    fn missing_type_is_rejected() {
        let data = doc("brand-id: acme", None, b"sig");
        assert!(matches!(
            Decoder::new(&data).decode(),
            Err(AssertionError::MissingType)
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let data = doc("type: account", None, b"sig");
        assert!(matches!(
            Decoder::new(&data).decode(),
            Err(AssertionError::UnknownKind(_))
        ));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let data = b"type: serial-request\nbody-length: 100\n\nshort".to_vec();
        assert!(matches!(
            Decoder::new(&data).decode(),
            Err(AssertionError::TruncatedBody { expected: 100, .. })
        ));
    }

    #[test]
    fn bad_header_line_is_rejected() {
        let data = doc("type: model\nno-separator-here", None, b"sig");
        assert!(matches!(
            Decoder::new(&data).decode(),
            Err(AssertionError::Header(_))
        ));
    }

    #[test]
    fn duplicate_header_is_rejected() {
        let data = doc("type: model\nbrand-id: a\nbrand-id: b", None, b"sig");
        assert!(matches!(
            Decoder::new(&data).decode(),
            Err(AssertionError::DuplicateHeader(_))
        ));
    }

    #[test]
    fn bad_base64_signature_is_rejected() {
        let data = b"type: model\nbrand-id: acme\n\n!!!not-base64!!!\n".to_vec();
        assert!(matches!(
            Decoder::new(&data).decode(),
            Err(AssertionError::Signature(_))
        ));
    }

    #[test]
    fn parse_key_values_skips_malformed_lines() {
        let body = b"serial: SN42\ngarbage line\nmodel : rpi\n";
        let kv = parse_key_values(body);
        assert_eq!(kv.get("serial").map(String::as_str), Some("SN42"));
        assert_eq!(kv.get("model").map(String::as_str), Some("rpi"));
        assert_eq!(kv.len(), 2);
    }
}
