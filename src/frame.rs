// ABOUTME: Provides a type representing a STOMP protocol frame as well as utilities for
// ABOUTME: constructing, inspecting, and serializing frames to bytes.

use crate::body;
use bytes::{BufMut, Bytes, BytesMut};
use core::fmt;

/// Default virtual host used for the `host` header when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Default STOMP broker port.
pub const DEFAULT_PORT: u16 = 61613;

/// Default MIME type for frame bodies that don't specify one.
pub const DEFAULT_MIME: &str = "text/plain";

/// Native encoding tag used as the default `content-type` charset.
///
/// The reference implementation's native string representation is UTF-16LE;
/// we keep the same default tag so `content-type` headers constructed by this
/// library match frames produced by the original client.
pub const DEFAULT_ENCODING: &str = "utf16le";

/// A single STOMP frame: a command, an ordered list of headers, and an
/// optional body.
///
/// Headers preserve insertion order and permit duplicates; lookups return
/// the *last* matching value, matching STOMP 1.1 semantics for repeated
/// headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    command: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl Frame {
    /// Construct an empty frame for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Frame {
            command: command.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Construct a frame with pre-sized header and body capacity.
    pub fn with_capacity(command: impl Into<String>, headers: usize, body_len: usize) -> Self {
        Frame {
            command: command.into(),
            headers: Vec::with_capacity(headers),
            body: if body_len > 0 {
                Some(Bytes::from(BytesMut::zeroed(body_len)))
            } else {
                None
            },
        }
    }

    /// The frame's command, as constructed or as parsed (upper-cased, trimmed).
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Set the command.
    pub fn set_command(&mut self, command: impl Into<String>) {
        self.command = command.into();
    }

    /// The frame's headers in insertion order, including duplicates.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The frame's body, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Reference an existing buffer as the body without copying.
    pub fn set_body_slice(&mut self, body: Bytes) {
        self.body = Some(body);
    }

    /// Deep-copy `body` into a newly owned buffer.
    pub fn set_body_owned(&mut self, body: &[u8]) {
        self.body = Some(Bytes::copy_from_slice(body));
    }

    /// Clear the body.
    pub fn clear_body(&mut self) {
        self.body = None;
    }

    /// Append a header at the end of the list. The name is lower-cased; an
    /// empty value is coerced to `""`.
    pub fn append_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
    }

    /// Replace the last header with a matching name in place, or append one
    /// if none exists. Returns the previous value, if any.
    pub fn override_header(
        &mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Option<String> {
        let name = name.as_ref().to_ascii_lowercase();
        match self.last_index_of(&name) {
            Some(idx) => Some(std::mem::replace(&mut self.headers[idx].1, value.into())),
            None => {
                self.headers.push((name, value.into()));
                None
            }
        }
    }

    /// Remove the last header with a matching name and return its prior
    /// value, or `""` if none existed.
    pub fn remove_last_header_of_type(&mut self, name: impl AsRef<str>) -> String {
        let name = name.as_ref().to_ascii_lowercase();
        match self.last_index_of(&name) {
            Some(idx) => self.headers.remove(idx).1,
            None => String::new(),
        }
    }

    /// Remove every header with a matching name.
    pub fn remove_all_headers_of_type(&mut self, name: impl AsRef<str>) {
        let name = name.as_ref().to_ascii_lowercase();
        self.headers.retain(|(k, _)| k != &name);
    }

    /// The value of the last header with the given name, or `""` if none
    /// exists.
    pub fn get_header_value(&self, name: impl AsRef<str>) -> &str {
        let name = name.as_ref().to_ascii_lowercase();
        match self.last_index_of(&name) {
            Some(idx) => &self.headers[idx].1,
            None => "",
        }
    }

    /// Whether a header with the given name exists.
    pub fn has_header(&self, name: impl AsRef<str>) -> bool {
        let name = name.as_ref().to_ascii_lowercase();
        self.last_index_of(&name).is_some()
    }

    fn last_index_of(&self, lower_name: &str) -> Option<usize> {
        self.headers.iter().rposition(|(k, _)| k == lower_name)
    }

    /// Append a `content-type` header built from `mime`/`encoding`.
    pub fn append_content_type(&mut self, mime: &str, encoding: &str) {
        self.headers
            .push(("content-type".to_string(), content_type_value(mime, encoding)));
    }

    /// Override the `content-type` header built from `mime`/`encoding`.
    pub fn override_content_type(&mut self, mime: &str, encoding: &str) {
        self.override_header("content-type", content_type_value(mime, encoding));
    }

    /// Append a `content-length` header reflecting the current body length.
    pub fn append_content_length(&mut self) {
        let len = self.body.as_ref().map(|b| b.len()).unwrap_or(0);
        self.headers
            .push(("content-length".to_string(), len.to_string()));
    }

    /// Override the `content-length` header reflecting the current body length.
    pub fn override_content_length(&mut self) {
        let len = self.body.as_ref().map(|b| b.len()).unwrap_or(0);
        self.override_header("content-length", len.to_string());
    }

    /// Set the body (and a matching `content-type` header) from a UTF-8
    /// string, overriding any existing `content-type`.
    pub fn set_body_from_str(&mut self, text: &str) {
        let (bytes, content_type) = body::from_str(text);
        self.body = Some(bytes);
        self.override_content_type(&content_type.mime, &content_type.encoding);
    }

    /// Set the body (and a matching `content-type` header) by JSON-encoding
    /// `value`.
    pub fn set_body_from_json<T: serde::Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let (bytes, content_type) = body::from_json(value)?;
        self.body = Some(bytes);
        self.override_content_type(&content_type.mime, &content_type.encoding);
        Ok(())
    }

    /// Set the body to the base64 encoding of `data`.
    pub fn set_body_from_base64(&mut self, data: &[u8]) {
        let (bytes, content_type) = body::from_base64(data);
        self.body = Some(bytes);
        self.override_content_type(&content_type.mime, &content_type.encoding);
    }

    /// Compute the exact wire size this frame would serialize to.
    pub fn wire_size(&self) -> usize {
        let mut size = self.command.len() + 1;
        for (key, value) in &self.headers {
            size += escaped_len(key) + 1 + escaped_len(value) + 1;
        }
        size += 1; // blank header-terminator line
        size += self.body.as_ref().map(|b| b.len()).unwrap_or(0);
        size += 1; // null terminator
        size
    }

    /// Serialize this frame to a newly allocated buffer, exactly
    /// [`Frame::wire_size`] bytes long.
    pub fn to_buffer(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        buf.put_slice(self.command.as_bytes());
        buf.put_u8(b'\n');
        for (key, value) in &self.headers {
            write_escaped(key.as_bytes(), &mut buf);
            buf.put_u8(b':');
            write_escaped(value.as_bytes(), &mut buf);
            buf.put_u8(b'\n');
        }
        buf.put_u8(b'\n');
        if let Some(body) = &self.body {
            buf.put_slice(body);
        }
        buf.put_u8(0);
        buf.freeze()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.command)?;
        for (key, value) in &self.headers {
            writeln!(f, "{key}:{value}")?;
        }
        if let Some(body) = &self.body {
            write!(f, "\n{}", String::from_utf8_lossy(body))
        } else {
            write!(f, "")
        }
    }
}

/// Builds the `content-type` header value `"<mime>;charset=<iso-label>"`.
pub fn content_type_value(mime: &str, encoding: &str) -> String {
    format!(
        "{};charset={}",
        mime.to_ascii_lowercase(),
        native_to_iso(encoding)
    )
}

/// Splits a `content-type` header value into (mime, native encoding tag).
pub fn parse_content_type(value: &str) -> (String, String) {
    match value.split_once(";charset=") {
        Some((mime, charset)) => (mime.to_string(), iso_to_native(charset)),
        None => (value.to_string(), DEFAULT_ENCODING.to_string()),
    }
}

fn native_to_iso(native: &str) -> String {
    match native {
        "utf16le" => "utf-16".to_string(),
        "utf8" => "utf-8".to_string(),
        "ascii" => "ascii".to_string(),
        "base64" => "base64".to_string(),
        other => other.to_string(),
    }
}

fn iso_to_native(iso: &str) -> String {
    match iso {
        "utf-16" | "utf-16le" => "utf16le".to_string(),
        "utf-8" => "utf8".to_string(),
        "ascii" | "us-ascii" => "ascii".to_string(),
        "base64" => "base64".to_string(),
        other => other.to_string(),
    }
}

fn escaped_len(s: &str) -> usize {
    s.bytes()
        .map(|b| match b {
            b'\\' | b':' | b'\n' => 2,
            _ => 1,
        })
        .sum()
}

fn write_escaped(bytes: &[u8], buf: &mut BytesMut) {
    for &b in bytes {
        match b {
            b'\\' => buf.put_slice(b"\\\\"),
            b':' => buf.put_slice(b"\\c"),
            b'\n' => buf.put_slice(b"\\n"),
            _ => buf.put_u8(b),
        }
    }
}
