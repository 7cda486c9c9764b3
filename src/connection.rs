// ABOUTME: Adapts a byte-oriented TCP transport into a frame-oriented event stream,
// ABOUTME: owning one Parser for inbound bytes and the buffered outbound write path.

use crate::frame::Frame;
use crate::parser::Parser;
use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Sentinel returned by [`Connection::send`] when the connection cannot
/// currently accept outbound frames.
pub const SEND_REJECTED: i64 = -1;

/// A frame-level event surfaced by [`Connection::next_event`].
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A complete frame arrived on the wire.
    Message(Frame),
    /// The transport closed. `had_error` is true when the closure was
    /// observed as an I/O error rather than a clean EOF.
    Disconnect { had_error: bool },
}

/// Wraps a [`TcpStream`] with a buffered writer and an incremental [`Parser`],
/// translating raw bytes into [`ConnectionEvent`]s.
#[derive(Debug)]
pub struct Connection {
    stream: BufWriter<TcpStream>,
    read_buf: Vec<u8>,
    parser: Parser,
    pending: VecDeque<Frame>,
    message_id: u64,
    can_send: bool,
    closed: bool,
}

impl Connection {
    /// Open a TCP connection to `addr` and wrap it.
    #[tracing::instrument(skip(addr))]
    pub async fn connect<A>(addr: A) -> io::Result<Connection>
    where
        A: ToSocketAddrs + std::fmt::Debug,
    {
        let socket = TcpStream::connect(addr).await?;
        tracing::debug!("tcp transport established");
        Ok(Connection::new(socket))
    }

    /// Wrap an already-connected socket. `can_send` starts true and
    /// `message_id` starts at zero, matching the source's `connect` event.
    pub fn new(socket: TcpStream) -> Connection {
        Connection {
            stream: BufWriter::new(socket),
            read_buf: vec![0u8; 4 * 1024],
            parser: Parser::new(),
            pending: VecDeque::new(),
            message_id: 0,
            can_send: true,
            closed: false,
        }
    }

    /// Whether the connection currently accepts outbound sends.
    pub fn can_send(&self) -> bool {
        self.can_send
    }

    /// Wait for the next frame-level event.
    ///
    /// Drains any frames already extracted from a prior read before issuing
    /// a new socket read, so a single read that yields several frames emits
    /// them one [`ConnectionEvent::Message`] at a time in wire order.
    #[tracing::instrument(skip(self))]
    pub async fn next_event(&mut self) -> io::Result<ConnectionEvent> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                tracing::trace!(command = %frame.command(), headers = frame.headers().len(), "frame received");
                return Ok(ConnectionEvent::Message(frame));
            }

            if self.closed {
                return Ok(ConnectionEvent::Disconnect { had_error: false });
            }

            match tokio::io::AsyncReadExt::read(&mut self.stream, &mut self.read_buf).await {
                Ok(0) => {
                    self.can_send = false;
                    self.closed = true;
                    return Ok(ConnectionEvent::Disconnect { had_error: false });
                }
                Ok(n) => {
                    let frames = self.parser.push_bulk(&self.read_buf[..n]);
                    self.pending.extend(frames);
                }
                Err(e) => {
                    self.can_send = false;
                    self.closed = true;
                    tracing::warn!(error = %e, "transport error");
                    return Err(e);
                }
            }
        }
    }

    /// Serialize `frame` and write it to the transport, returning the
    /// `messageId` assigned to it. Returns [`SEND_REJECTED`] without writing
    /// if the connection cannot currently send.
    #[tracing::instrument(skip(self, frame), fields(command = %frame.command()))]
    pub async fn send(&mut self, frame: &Frame) -> io::Result<i64> {
        if !self.can_send {
            return Ok(SEND_REJECTED);
        }
        let buf = frame.to_buffer();
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        let id = self.message_id as i64;
        self.message_id += 1;
        tracing::trace!(message_id = id, "frame sent");
        Ok(id)
    }

    /// The id that would be assigned to the *next* frame sent.
    pub fn next_message_id(&self) -> i64 {
        self.message_id as i64
    }

    /// Half-close the outbound side. Inbound data may still arrive until the
    /// transport fully closes.
    pub async fn disconnect(&mut self) -> io::Result<()> {
        self.can_send = false;
        self.stream.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn loopback_pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server_socket, _) = listener.accept().await.unwrap();
        let client_socket = client.await.unwrap();
        (Connection::new(server_socket), client_socket)
    }

    #[tokio::test]
    async fn receives_a_frame_written_by_the_peer() {
        let (mut conn, mut client) = loopback_pair().await;
        client
            .write_all(b"MESSAGE\ndestination:/q\n\nhi\0")
            .await
            .unwrap();

        match conn.next_event().await.unwrap() {
            ConnectionEvent::Message(frame) => {
                assert_eq!(frame.command(), "MESSAGE");
                assert_eq!(frame.body(), Some(&b"hi"[..]));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn peer_close_yields_disconnect_without_error() {
        let (mut conn, client) = loopback_pair().await;
        drop(client);

        match conn.next_event().await.unwrap() {
            ConnectionEvent::Disconnect { had_error } => assert!(!had_error),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(!conn.can_send());
    }

    #[tokio::test]
    async fn send_assigns_increasing_message_ids() {
        let (mut conn, mut client) = loopback_pair().await;
        let frame = Frame::new("SEND");

        let first = conn.send(&frame).await.unwrap();
        let second = conn.send(&frame).await.unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 1);

        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert!(n > 0);
    }

    #[tokio::test]
    async fn send_after_disconnect_is_rejected() {
        let (mut conn, _client) = loopback_pair().await;
        conn.disconnect().await.unwrap();
        let id = conn.send(&Frame::new("SEND")).await.unwrap();
        assert_eq!(id, SEND_REJECTED);
    }
}
