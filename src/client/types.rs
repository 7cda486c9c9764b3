// ABOUTME: Supporting types for STOMP client operations, mirroring the source's
// ABOUTME: session-identity and outbound-message builder surface.

use crate::body::ContentType;
use bytes::Bytes;

pub use crate::connector::{AckMode, ConnectOptions};

/// A message ready to be sent to a destination, with its body and the
/// content-type that describes it already resolved.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub destination: String,
    pub body: Bytes,
    pub mime: String,
    pub encoding: String,
    pub receipt: bool,
}

impl SendMessage {
    /// Create a builder for constructing a message destined for `destination`.
    pub fn builder(destination: impl Into<String>) -> SendMessageBuilder {
        SendMessageBuilder::new(destination)
    }
}

/// Builder for [`SendMessage`], mirroring the teacher's fluent message
/// builders: a required destination, one of the body-building conveniences
/// from [`crate::body`], and optional delivery options.
#[derive(Debug, Default)]
pub struct SendMessageBuilder {
    destination: String,
    body: Option<(Bytes, ContentType)>,
    receipt: bool,
}

impl SendMessageBuilder {
    fn new(destination: impl Into<String>) -> Self {
        SendMessageBuilder {
            destination: destination.into(),
            body: None,
            receipt: false,
        }
    }

    /// Set the body from a UTF-8 string.
    pub fn text(mut self, text: &str) -> Self {
        self.body = Some(crate::body::from_str(text));
        self
    }

    /// Set the body by JSON-serializing `value`.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(crate::body::from_json(value)?);
        Ok(self)
    }

    /// Set the body to the base64 encoding of `data`.
    pub fn base64(mut self, data: &[u8]) -> Self {
        self.body = Some(crate::body::from_base64(data));
        self
    }

    /// Request a broker receipt for this send.
    pub fn with_receipt(mut self) -> Self {
        self.receipt = true;
        self
    }

    /// Build the message. Defaults to an empty `text/plain` body when no
    /// body-building method was called.
    pub fn build(self) -> SendMessage {
        let (body, content_type) = self
            .body
            .unwrap_or_else(|| crate::body::from_str(""));
        SendMessage {
            destination: self.destination,
            body,
            mime: content_type.mime,
            encoding: content_type.encoding,
            receipt: self.receipt,
        }
    }
}
