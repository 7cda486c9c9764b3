// ABOUTME: Core STOMP client traits using native async functions, layered the way
// ABOUTME: the teacher crate layers connection/session/role traits.

use crate::client::error::StompResult;
use crate::client::types::{AckMode, ConnectOptions, SendMessage};
use crate::connector::ConnectorEvent;
use crate::frame::Frame;
use std::future::Future;
use tokio::net::ToSocketAddrs;

/// Base connection management for STOMP clients.
pub trait StompConnection {
    /// Open a TCP connection and perform the CONNECT/CONNECTED handshake,
    /// returning once the session is `ConnectorReady` or the broker rejects it.
    fn connect<T: ToSocketAddrs + Send + std::fmt::Debug>(
        addr: T,
        options: ConnectOptions,
    ) -> impl Future<Output = StompResult<Self>> + Send
    where
        Self: Sized;

    /// Gracefully disconnect: send DISCONNECT with a receipt, then half-close.
    fn disconnect(&mut self) -> impl Future<Output = StompResult<()>> + Send;

    /// Whether the session is currently established.
    fn is_connected(&self) -> bool;
}

/// Core STOMP session operations common to every client role.
pub trait StompClient: StompConnection {
    /// Subscribe to `destination` under subscription id `id`.
    fn subscribe(
        &mut self,
        id: &str,
        destination: &str,
        ack: AckMode,
    ) -> impl Future<Output = StompResult<()>> + Send;

    /// Unsubscribe a previously subscribed id.
    fn unsubscribe(&mut self, id: &str, destination: &str) -> impl Future<Output = StompResult<()>> + Send;

    /// Acknowledge a previously received MESSAGE frame.
    fn ack(&mut self, message: &Frame) -> impl Future<Output = StompResult<()>> + Send;

    /// Negatively acknowledge a previously received MESSAGE frame.
    fn nack(&mut self, message: &Frame) -> impl Future<Output = StompResult<()>> + Send;

    /// Wait for the next session-level event.
    fn next_event(&mut self) -> impl Future<Output = ConnectorEvent> + Send;
}

/// STOMP transmitter operations: publishing messages to destinations.
pub trait StompTransmitter: StompClient {
    /// Send `message` to its destination, returning the id the connection
    /// assigned to the write (or the broker-assigned receipt id, if the
    /// message requested one).
    fn send(&mut self, message: &SendMessage) -> impl Future<Output = StompResult<i64>> + Send;
}

/// STOMP receiver operations: waiting for inbound MESSAGE frames.
pub trait StompReceiver: StompClient {
    /// Wait for the next inbound MESSAGE frame, filtering out any other
    /// session event in between.
    fn receive_message(&mut self) -> impl Future<Output = StompResult<Frame>> + Send;
}

/// Combines [`StompTransmitter`] and [`StompReceiver`] for bidirectional use.
pub trait StompTransceiver: StompTransmitter + StompReceiver {}

impl<T> StompTransceiver for T where T: StompTransmitter + StompReceiver {}
