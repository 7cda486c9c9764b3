// ABOUTME: Session-level state machine layered over Connection: drives the STOMP
// ABOUTME: handshake, classifies inbound frames, and builds outbound frame helpers.

use crate::connection::{Connection, ConnectionEvent};
use crate::frame::{Frame, DEFAULT_HOST};
use std::collections::VecDeque;
use std::io;
use tokio::net::ToSocketAddrs;

/// Acknowledgment mode for a SUBSCRIBE frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AckMode {
    Auto,
    Client,
    ClientIndividual,
    /// An unvalidated custom token, preserved verbatim.
    Other(String),
}

impl AckMode {
    fn as_header_value(&self) -> &str {
        match self {
            AckMode::Auto => "auto",
            AckMode::Client => "client",
            AckMode::ClientIndividual => "client-individual",
            AckMode::Other(value) => value,
        }
    }
}

impl Default for AckMode {
    fn default() -> Self {
        AckMode::Auto
    }
}

/// Connection parameters used to build the CONNECT frame.
#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    pub broker: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        ConnectOptions::default()
    }

    pub fn with_broker(mut self, broker: impl Into<String>) -> Self {
        self.broker = broker.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    SocketDisconnected,
    ConnectSent,
    ConnectorReady,
    DisconnectSent,
}

/// An event surfaced by [`Connector::next_event`].
#[derive(Debug)]
pub enum ConnectorEvent {
    /// CONNECTED was accepted; a SUBSCRIBE phase may now begin.
    Subscribe,
    /// The session is fully established.
    Ready { version: String, session: String },
    /// A frame arrived on the wire, emitted before any classification.
    Message(Frame),
    /// A transport-level error occurred.
    Error(io::Error),
    /// The broker rejected the CONNECT frame.
    Rejected { reason: Option<String> },
    /// A RECEIPT frame arrived, correlating with a `receipt` header previously
    /// attached via [`Connector::request_receipt`].
    Receipt { receipt_id: String },
    /// The session ended.
    Disconnect { graceful: bool },
}

/// The session-level state machine on top of [`Connection`].
#[derive(Debug)]
pub struct Connector {
    connection: Connection,
    options: ConnectOptions,
    state: SessionState,
    version: Option<String>,
    session_id: Option<String>,
    disconnect_id: Option<i64>,
    pending: VecDeque<ConnectorEvent>,
    disconnected: bool,
    terminal_graceful: bool,
}

impl Connector {
    /// Open a TCP connection to `addr` and send the CONNECT frame.
    #[tracing::instrument(skip(addr, options))]
    pub async fn connect<A>(addr: A, options: ConnectOptions) -> io::Result<Connector>
    where
        A: ToSocketAddrs + std::fmt::Debug,
    {
        let mut connection = Connection::connect(addr).await?;
        let connect_frame = Self::build_connect_frame(&options);
        connection.send(&connect_frame).await?;
        Ok(Connector {
            connection,
            options,
            state: SessionState::ConnectSent,
            version: None,
            session_id: None,
            disconnect_id: None,
            pending: VecDeque::new(),
            disconnected: false,
            terminal_graceful: false,
        })
    }

    fn build_connect_frame(options: &ConnectOptions) -> Frame {
        let host = if options.broker.is_empty() {
            DEFAULT_HOST.to_string()
        } else {
            options.broker.clone()
        };
        let mut frame = Frame::new("CONNECT");
        frame.append_header("accept-version", "1.0,1.1");
        frame.append_header("host", host);
        if let (Some(username), Some(password)) = (&options.username, &options.password) {
            frame.append_header("login", username.clone());
            frame.append_header("passcode", password.clone());
        }
        frame
    }

    /// The negotiated STOMP version, once `ConnectorReady`.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The broker-assigned session id, once `ConnectorReady`.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Wait for the next session-level event, draining any events already
    /// queued from a prior wire event before reading the socket again.
    ///
    /// Once a terminal `Disconnect` has been delivered, further calls keep
    /// returning that same event without touching the socket again: the
    /// underlying `Connection` reports EOF on every poll past its own close
    /// (by design, like a repeated zero-length read), and without this guard
    /// that would surface as an unbounded stream of `Disconnect` events
    /// instead of the one-shot terminal event callers expect.
    #[tracing::instrument(skip(self))]
    pub async fn next_event(&mut self) -> ConnectorEvent {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return event;
            }

            if self.disconnected {
                return ConnectorEvent::Disconnect {
                    graceful: self.terminal_graceful,
                };
            }

            match self.connection.next_event().await {
                Ok(ConnectionEvent::Message(frame)) => {
                    self.pending.push_back(ConnectorEvent::Message(frame.clone()));
                    self.classify(frame);
                }
                Ok(ConnectionEvent::Disconnect { had_error }) => {
                    let graceful = had_error || self.disconnect_id.is_some();
                    self.state = SessionState::SocketDisconnected;
                    self.version = None;
                    self.session_id = None;
                    self.disconnected = true;
                    self.terminal_graceful = graceful;
                    self.pending.push_back(ConnectorEvent::Disconnect { graceful });
                }
                Err(e) => {
                    self.state = SessionState::SocketDisconnected;
                    let had_error = true;
                    let graceful = had_error || self.disconnect_id.is_some();
                    self.disconnected = true;
                    self.terminal_graceful = graceful;
                    self.pending.push_back(ConnectorEvent::Error(e));
                    self.pending.push_back(ConnectorEvent::Disconnect { graceful });
                }
            }
        }
    }

    fn classify(&mut self, frame: Frame) {
        match frame.command() {
            "CONNECTED" if self.state == SessionState::ConnectSent => {
                let version = frame.get_header_value("version").to_string();
                let session = frame.get_header_value("session").to_string();
                self.version = Some(version.clone());
                self.session_id = Some(session.clone());
                self.state = SessionState::ConnectorReady;
                self.pending.push_back(ConnectorEvent::Subscribe);
                self.pending.push_back(ConnectorEvent::Ready { version, session });
            }
            "ERROR" if self.state == SessionState::ConnectSent => {
                let reason = frame.headers().iter().find(|(k, _)| k == "message").map(|(_, v)| v.clone());
                self.state = SessionState::SocketDisconnected;
                self.pending.push_back(ConnectorEvent::Rejected { reason });
            }
            "RECEIPT" => {
                let receipt_id = frame.get_header_value("receipt-id").to_string();
                tracing::trace!(receipt_id = %receipt_id, "receipt received");
                self.pending.push_back(ConnectorEvent::Receipt { receipt_id });
            }
            _ => {}
        }
    }

    /// Override the `receipt` header with the id the next send would be
    /// assigned, and return that id.
    pub fn request_receipt(&self, frame: &mut Frame) -> i64 {
        let id = self.connection.next_message_id();
        frame.override_header("receipt", id.to_string());
        id
    }

    /// Build a SUBSCRIBE frame.
    pub fn subscribe_frame(&self, id: impl Into<String>, destination: impl Into<String>, ack: AckMode) -> Frame {
        let mut frame = Frame::new("SUBSCRIBE");
        frame.append_header("id", id.into());
        frame.append_header("destination", destination.into());
        frame.append_header("ack", ack.as_header_value());
        frame
    }

    /// Build an UNSUBSCRIBE frame.
    pub fn unsubscribe_frame(&self, id: impl Into<String>, destination: impl Into<String>) -> Frame {
        let mut frame = Frame::new("UNSUBSCRIBE");
        frame.append_header("id", id.into());
        frame.append_header("destination", destination.into());
        frame
    }

    /// Build an ACK frame, correlating with an inbound MESSAGE's
    /// `subscription` (falling back to `destination`) and `message-id`.
    pub fn ack_frame(&self, message: &Frame) -> Frame {
        self.ack_style_frame("ACK", message)
    }

    /// Build a NACK frame, correlating the same way as [`Connector::ack_frame`].
    pub fn nack_frame(&self, message: &Frame) -> Frame {
        self.ack_style_frame("NACK", message)
    }

    fn ack_style_frame(&self, command: &str, message: &Frame) -> Frame {
        let mut frame = Frame::new(command);
        let subscription = if message.has_header("subscription") {
            message.get_header_value("subscription")
        } else {
            message.get_header_value("destination")
        };
        frame.append_header("subscription", subscription);
        frame.append_header("message-id", message.get_header_value("message-id"));
        frame
    }

    /// Build a SEND frame targeting `destination`, with no body attached.
    pub fn send_frame(&self, destination: impl Into<String>) -> Frame {
        let mut frame = Frame::new("SEND");
        frame.append_header("destination", destination.into());
        frame
    }

    /// Build a DISCONNECT frame and, if `with_receipt`, attach a `receipt`
    /// header whose id becomes the `disconnect_id` used in the graceful
    /// shutdown computation.
    fn disconnect_frame(&mut self, with_receipt: bool) -> Frame {
        let mut frame = Frame::new("DISCONNECT");
        if with_receipt {
            let id = self.connection.next_message_id();
            frame.append_header("receipt", id.to_string());
            self.disconnect_id = Some(id);
        }
        frame
    }

    /// Send `frame` through the owned connection.
    pub async fn send(&mut self, frame: &Frame) -> io::Result<i64> {
        self.connection.send(frame).await
    }

    /// Disconnect the session. `graceful` requests a DISCONNECT frame with a
    /// receipt before half-closing; otherwise the transport is half-closed
    /// immediately.
    pub async fn disconnect(&mut self, graceful: bool) -> io::Result<()> {
        if graceful {
            let frame = self.disconnect_frame(true);
            self.connection.send(&frame).await?;
            self.state = SessionState::DisconnectSent;
        }
        self.connection.disconnect().await
    }

    /// The [`ConnectOptions`] this connector was constructed with.
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn broker_pair(options: ConnectOptions) -> (Connector, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect_task = tokio::spawn(async move { Connector::connect(addr, options).await.unwrap() });
        let (mut broker_socket, _) = listener.accept().await.unwrap();

        let mut buf = vec![0u8; 256];
        let n = broker_socket.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("CONNECT\n"));

        let connector = connect_task.await.unwrap();
        (connector, broker_socket)
    }

    #[tokio::test]
    async fn connect_frame_carries_credentials_and_defaults_host() {
        let options = ConnectOptions::new().with_credentials("u", "p");
        let (_connector, _socket) = broker_pair(options).await;
    }

    #[tokio::test]
    async fn s3_handshake_emits_subscribe_then_ready() {
        let options = ConnectOptions::new().with_credentials("u", "p");
        let (mut connector, mut broker_socket) = broker_pair(options).await;

        broker_socket
            .write_all(b"CONNECTED\nversion:1.1\nsession:abc\n\n\0")
            .await
            .unwrap();

        assert!(matches!(connector.next_event().await, ConnectorEvent::Message(_)));
        assert!(matches!(connector.next_event().await, ConnectorEvent::Subscribe));
        match connector.next_event().await {
            ConnectorEvent::Ready { version, session } => {
                assert_eq!(version, "1.1");
                assert_eq!(session, "abc");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(connector.version(), Some("1.1"));
    }

    #[tokio::test]
    async fn s4_rejected_credentials_then_disconnect() {
        let options = ConnectOptions::new().with_credentials("u", "wrong");
        let (mut connector, mut broker_socket) = broker_pair(options).await;

        broker_socket
            .write_all(b"ERROR\nmessage:bad login\n\n\0")
            .await
            .unwrap();
        drop(broker_socket);

        assert!(matches!(connector.next_event().await, ConnectorEvent::Message(_)));
        match connector.next_event().await {
            ConnectorEvent::Rejected { reason } => assert_eq!(reason.as_deref(), Some("bad login")),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            connector.next_event().await,
            ConnectorEvent::Disconnect { .. }
        ));
    }

    #[tokio::test]
    async fn disconnect_event_is_delivered_exactly_once() {
        let options = ConnectOptions::new().with_credentials("u", "wrong");
        let (mut connector, mut broker_socket) = broker_pair(options).await;

        broker_socket
            .write_all(b"ERROR\nmessage:bad login\n\n\0")
            .await
            .unwrap();
        drop(broker_socket);

        assert!(matches!(connector.next_event().await, ConnectorEvent::Message(_)));
        assert!(matches!(connector.next_event().await, ConnectorEvent::Rejected { .. }));

        let first = connector.next_event().await;
        let second = connector.next_event().await;
        let third = connector.next_event().await;
        assert!(matches!(first, ConnectorEvent::Disconnect { graceful: false }));
        assert!(matches!(second, ConnectorEvent::Disconnect { graceful: false }));
        assert!(matches!(third, ConnectorEvent::Disconnect { graceful: false }));
    }

    #[tokio::test]
    async fn receipt_frame_is_classified_distinctly_from_message() {
        let options = ConnectOptions::new();
        let (mut connector, mut broker_socket) = broker_pair(options).await;

        broker_socket
            .write_all(b"RECEIPT\nreceipt-id:7\n\n\0")
            .await
            .unwrap();

        assert!(matches!(connector.next_event().await, ConnectorEvent::Message(_)));
        match connector.next_event().await {
            ConnectorEvent::Receipt { receipt_id } => assert_eq!(receipt_id, "7"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ack_frame_prefers_subscription_over_destination() {
        let options = ConnectOptions::new();
        let (connector, _socket) = broker_pair(options).await;

        let mut message = Frame::new("MESSAGE");
        message.append_header("destination", "/q/a");
        message.append_header("subscription", "0");
        message.append_header("message-id", "42");

        let ack = connector.ack_frame(&message);
        assert_eq!(ack.command(), "ACK");
        assert_eq!(ack.get_header_value("subscription"), "0");
        assert_eq!(ack.get_header_value("message-id"), "42");
    }

    #[tokio::test]
    async fn ack_frame_falls_back_to_destination_without_subscription() {
        let options = ConnectOptions::new();
        let (connector, _socket) = broker_pair(options).await;

        let mut message = Frame::new("MESSAGE");
        message.append_header("destination", "/q/a");
        message.append_header("message-id", "42");

        let ack = connector.ack_frame(&message);
        assert_eq!(ack.get_header_value("subscription"), "/q/a");
    }
}
