// ABOUTME: Free functions for building frame bodies from strings, JSON values, and
// ABOUTME: base64 payloads, each paired with the content-type that describes it.

use crate::frame::DEFAULT_MIME;
use base64::Engine;
use bytes::Bytes;

/// The parts of a `content-type` header, kept separate so callers can
/// compose it with [`crate::frame::content_type_value`].
#[derive(Debug)]
pub struct ContentType {
    pub mime: String,
    pub encoding: String,
}

impl ContentType {
    fn new(mime: &str, encoding: &str) -> Self {
        ContentType {
            mime: mime.to_string(),
            encoding: encoding.to_string(),
        }
    }
}

/// Build a body from a UTF-8 string.
pub fn from_str(text: &str) -> (Bytes, ContentType) {
    (
        Bytes::copy_from_slice(text.as_bytes()),
        ContentType::new(DEFAULT_MIME, "utf8"),
    )
}

/// Build a body by JSON-serializing `value`.
pub fn from_json<T: serde::Serialize>(
    value: &T,
) -> Result<(Bytes, ContentType), serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok((Bytes::from(bytes), ContentType::new("text/json", "utf8")))
}

/// Build a body by base64-encoding `data` into a newly allocated buffer.
pub fn from_base64(data: &[u8]) -> (Bytes, ContentType) {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    (
        Bytes::from(encoded.into_bytes()),
        ContentType::new(DEFAULT_MIME, "base64"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_is_utf8_and_text_plain() {
        let (bytes, content_type) = from_str("hello");
        assert_eq!(&bytes[..], b"hello");
        assert_eq!(content_type.mime, DEFAULT_MIME);
        assert_eq!(content_type.encoding, "utf8");
    }

    #[test]
    fn from_json_serializes_value() {
        #[derive(serde::Serialize)]
        struct Payload {
            hello: &'static str,
        }
        let (bytes, content_type) = from_json(&Payload { hello: "world" }).unwrap();
        assert_eq!(&bytes[..], br#"{"hello":"world"}"#);
        assert_eq!(content_type.mime, "text/json");
    }

    #[test]
    fn from_base64_round_trips() {
        let (bytes, content_type) = from_base64(b"hi there");
        assert_eq!(content_type.encoding, "base64");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&bytes[..])
            .unwrap();
        assert_eq!(decoded, b"hi there");
    }
}
