// ABOUTME: Push-driven byte-at-a-time finite state machine that turns a STOMP byte
// ABOUTME: stream into completed Frame values, tolerant of arbitrary network chunking.

use crate::frame::Frame;
use bytes::BytesMut;

/// Initial growth grain for the variable-length body buffer.
const BODY_GROWTH_CHUNK: usize = 8192;

/// Result of pushing a single byte into the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushResult {
    /// The frame is not complete yet; keep pushing bytes.
    NeedMore,
    /// A complete frame is ready; call [`Parser::return_message`] to take it,
    /// then [`Parser::reset`] before pushing further bytes.
    MessageReady,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OuterState {
    Syncing,
    Headers(HeaderState),
    Body,
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HeaderState {
    Command,
    KeyStart,
    KeyData,
    ValueStart,
    ValueData,
}

/// An incremental byte-oriented STOMP frame parser.
///
/// A single `Parser` is meant to be reused across the lifetime of one
/// connection: after a frame is extracted with [`Parser::return_message`],
/// call [`Parser::reset`] and keep feeding the next frame's bytes.
#[derive(Debug)]
pub struct Parser {
    state: OuterState,
    command: Vec<u8>,
    current_key: Vec<u8>,
    current_value: Vec<u8>,
    headers: Vec<(String, String)>,
    body: BytesMut,
    fixed_length: bool,
    body_size: usize,
    pending_escape: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Construct a parser ready to accept the start of a new frame.
    pub fn new() -> Self {
        Parser {
            state: OuterState::Syncing,
            command: Vec::new(),
            current_key: Vec::new(),
            current_value: Vec::new(),
            headers: Vec::new(),
            body: BytesMut::new(),
            fixed_length: false,
            body_size: 0,
            pending_escape: false,
        }
    }

    /// Advance the state machine by one byte.
    ///
    /// Once [`PushResult::MessageReady`] is returned, further calls are
    /// no-ops until [`Parser::reset`] is called.
    pub fn push(&mut self, byte: u8) -> PushResult {
        match self.state {
            OuterState::Ready => PushResult::MessageReady,
            OuterState::Syncing => self.push_syncing(byte),
            OuterState::Headers(header_state) => self.push_headers(header_state, byte),
            OuterState::Body => self.push_body(byte),
        }
    }

    /// Feed a whole chunk of bytes (e.g. one socket read), extracting every
    /// completed frame along the way. Leftover bytes that don't yet form a
    /// complete frame remain buffered in the parser's internal state.
    pub fn push_bulk(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        for &byte in bytes {
            if self.push(byte) == PushResult::MessageReady {
                if let Some(frame) = self.return_message() {
                    frames.push(frame);
                }
                self.reset();
            }
        }
        frames
    }

    /// Take the completed frame, if the parser has reached
    /// [`PushResult::MessageReady`]. Returns `None` otherwise.
    pub fn return_message(&mut self) -> Option<Frame> {
        if self.state != OuterState::Ready {
            return None;
        }
        let command = String::from_utf8_lossy(&self.command)
            .trim()
            .to_ascii_uppercase();
        let mut frame = Frame::new(command);
        for (key, value) in self.headers.drain(..) {
            frame.append_header(key, value);
        }
        if !self.body.is_empty() || self.fixed_length {
            frame.set_body_slice(self.body.split().freeze());
        }
        Some(frame)
    }

    /// Reset to the initial state, ready to parse the next frame.
    pub fn reset(&mut self) {
        self.state = OuterState::Syncing;
        self.command.clear();
        self.current_key.clear();
        self.current_value.clear();
        self.headers.clear();
        self.body.clear();
        self.fixed_length = false;
        self.body_size = 0;
        self.pending_escape = false;
    }

    fn push_syncing(&mut self, byte: u8) -> PushResult {
        if byte.is_ascii_alphabetic() {
            self.command.push(byte);
            self.state = OuterState::Headers(HeaderState::Command);
        }
        PushResult::NeedMore
    }

    fn push_headers(&mut self, header_state: HeaderState, byte: u8) -> PushResult {
        match header_state {
            HeaderState::Command => {
                if byte == b'\n' {
                    self.state = OuterState::Headers(HeaderState::KeyStart);
                } else {
                    self.command.push(byte);
                }
                PushResult::NeedMore
            }
            HeaderState::KeyStart => {
                if byte == b'\n' {
                    self.enter_body()
                } else {
                    self.current_key.clear();
                    self.current_value.clear();
                    self.pending_escape = false;
                    self.push_escaped_byte(byte, true);
                    self.state = OuterState::Headers(HeaderState::KeyData);
                    PushResult::NeedMore
                }
            }
            HeaderState::KeyData => {
                if byte == b'\n' && !self.pending_escape {
                    self.commit_header();
                    self.state = OuterState::Headers(HeaderState::KeyStart);
                } else if byte == b':' && !self.pending_escape {
                    self.state = OuterState::Headers(HeaderState::ValueStart);
                } else {
                    self.push_escaped_byte(byte, true);
                }
                PushResult::NeedMore
            }
            HeaderState::ValueStart | HeaderState::ValueData => {
                if byte == b'\n' && !self.pending_escape {
                    self.commit_header();
                    self.state = OuterState::Headers(HeaderState::KeyStart);
                } else {
                    self.push_escaped_byte(byte, false);
                    self.state = OuterState::Headers(HeaderState::ValueData);
                }
                PushResult::NeedMore
            }
        }
    }

    /// Unescape `byte` into `current_key` or `current_value` depending on
    /// `is_key`, tracking the STOMP 1.1 escape sequences `\\`, `\c`, `\n`.
    fn push_escaped_byte(&mut self, byte: u8, is_key: bool) {
        let target = if is_key {
            &mut self.current_key
        } else {
            &mut self.current_value
        };
        if self.pending_escape {
            self.pending_escape = false;
            match byte {
                b'c' => target.push(b':'),
                b'n' => target.push(b'\n'),
                b'\\' => target.push(b'\\'),
                // Unknown escape: consume the backslash and this byte, emit nothing.
                _ => {}
            }
        } else if byte == b'\\' {
            self.pending_escape = true;
        } else {
            target.push(byte);
        }
    }

    fn commit_header(&mut self) {
        let key = String::from_utf8_lossy(&self.current_key)
            .trim()
            .to_ascii_lowercase();
        let value = {
            let raw = String::from_utf8_lossy(&self.current_value);
            raw.trim_start().to_string()
        };
        self.headers.push((key, value));
        self.current_key.clear();
        self.current_value.clear();
        self.pending_escape = false;
    }

    fn enter_body(&mut self) -> PushResult {
        self.body_size = 0;
        self.fixed_length = false;
        if let Some((_, value)) = self
            .headers
            .iter()
            .rev()
            .find(|(k, _)| k == "content-length")
        {
            if let Ok(size) = value.trim().parse::<i64>() {
                if size >= 0 {
                    self.fixed_length = true;
                    self.body_size = size as usize;
                }
            }
        }
        self.body.clear();
        if self.fixed_length {
            self.body.reserve(self.body_size);
        } else {
            self.body.reserve(BODY_GROWTH_CHUNK);
        }
        self.state = OuterState::Body;
        PushResult::NeedMore
    }

    fn push_body(&mut self, byte: u8) -> PushResult {
        if self.fixed_length {
            if self.body.len() < self.body_size {
                self.body.extend_from_slice(&[byte]);
                PushResult::NeedMore
            } else if byte == 0 {
                self.state = OuterState::Ready;
                PushResult::MessageReady
            } else {
                // Surplus byte before the terminator: broker declared the
                // wrong length, discard and keep waiting for the null.
                PushResult::NeedMore
            }
        } else if byte == 0 {
            self.state = OuterState::Ready;
            PushResult::MessageReady
        } else {
            if self.body.capacity() == self.body.len() {
                self.body.reserve(BODY_GROWTH_CHUNK);
            }
            self.body.extend_from_slice(&[byte]);
            PushResult::NeedMore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(bytes: &[u8]) -> Vec<Frame> {
        let mut parser = Parser::new();
        parser.push_bulk(bytes)
    }

    const S1: &[u8] = b"MESSAGE\ndestination:/topic/a\nmessage-id:42\nsubscription:0\ncontent-type:text/json;charset=utf-8\ncontent-length:17\n\n{\"hello\":\"world\"}\0";

    #[test]
    fn s1_parses_message_with_json_body() {
        let frames = parse_all(S1);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.command(), "MESSAGE");
        assert_eq!(frame.headers().len(), 5);
        assert_eq!(frame.body(), Some(&b"{\"hello\":\"world\"}"[..]));
    }

    #[test]
    fn s2_variable_length_body() {
        let frames = parse_all(b"MESSAGE\ndestination:/q\n\nhi\0");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command(), "MESSAGE");
        assert_eq!(frames[0].body(), Some(&b"hi"[..]));
    }

    #[test]
    fn s5_header_escape_round_trip_on_parse() {
        let frames = parse_all(b"SEND\nk\\cey:v\\nal\\\\ue\n\n\0");
        assert_eq!(frames[0].get_header_value("k:ey"), "v\nal\\ue");
    }

    #[test]
    fn s6_chunked_delivery_matches_bulk() {
        let bulk = parse_all(S1);

        let mut parser = Parser::new();
        let mut byte_by_byte = Vec::new();
        for &b in S1 {
            if parser.push(b) == PushResult::MessageReady {
                byte_by_byte.push(parser.return_message().unwrap());
                parser.reset();
            }
        }

        assert_eq!(bulk.len(), 1);
        assert_eq!(byte_by_byte.len(), 1);
        assert_eq!(bulk[0], byte_by_byte[0]);

        // Arbitrary split point.
        let (first, second) = S1.split_at(23);
        let mut parser = Parser::new();
        let mut split_frames = parser.push_bulk(first);
        split_frames.extend(parser.push_bulk(second));
        assert_eq!(split_frames.len(), 1);
        assert_eq!(split_frames[0], bulk[0]);
    }

    #[test]
    fn heartbeat_newlines_are_skipped_while_syncing() {
        let frames = parse_all(b"\n\n\nMESSAGE\ndestination:/q\n\nhi\0");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command(), "MESSAGE");
    }

    #[test]
    fn empty_body_message_ready_on_first_null() {
        let frames = parse_all(b"DISCONNECT\n\n\0");
        assert_eq!(frames[0].body(), None);
    }

    #[test]
    fn content_length_zero_with_surplus_byte_discarded() {
        let frames = parse_all(b"MESSAGE\ncontent-length:0\n\nX\0");
        assert_eq!(frames[0].body(), Some(&b""[..]));
    }

    #[test]
    fn fixed_length_body_retains_embedded_nulls() {
        let mut data = Vec::new();
        data.extend_from_slice(b"MESSAGE\ncontent-length:3\n\n");
        data.extend_from_slice(&[0, 1, 0]);
        data.push(0); // terminator
        let frames = parse_all(&data);
        assert_eq!(frames[0].body(), Some(&[0u8, 1, 0][..]));
    }

    #[test]
    fn variable_length_body_stops_at_first_null() {
        let frames = parse_all(b"MESSAGE\n\nab\0cd\0");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body(), Some(&b"ab"[..]));
    }

    #[test]
    fn malformed_content_length_falls_back_to_variable_length() {
        let frames = parse_all(b"MESSAGE\ncontent-length:-5\n\nhi\0");
        assert_eq!(frames[0].body(), Some(&b"hi"[..]));
    }

    #[test]
    fn multiple_frames_in_one_stream() {
        let mut data = Vec::new();
        data.extend_from_slice(b"CONNECTED\nversion:1.1\n\n\0");
        data.extend_from_slice(b"MESSAGE\ndestination:/q\n\nhi\0");
        let frames = parse_all(&data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command(), "CONNECTED");
        assert_eq!(frames[1].command(), "MESSAGE");
    }

    #[test]
    fn duplicate_headers_preserved_in_order() {
        let frames = parse_all(b"MESSAGE\nfoo:1\nfoo:2\n\n\0");
        assert_eq!(
            frames[0].headers(),
            &[("foo".to_string(), "1".to_string()), ("foo".to_string(), "2".to_string())]
        );
        assert_eq!(frames[0].get_header_value("foo"), "2");
    }
}
