// ABOUTME: STOMP client error types for request/response call sites that have a
// ABOUTME: natural Result-shaped signature, as opposed to the async event pump.

use std::io;
use thiserror::Error;

/// Errors surfaced by the handful of request/response helpers on
/// [`crate::client::StompClient`] (e.g. `connect`, `subscribe`, `send`). The
/// async event pump (`Connector::next_event`) surfaces its own
/// [`crate::connector::ConnectorEvent`] variants instead.
#[derive(Debug, Error)]
pub enum StompError {
    /// Underlying transport failure.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// The broker replied ERROR to a CONNECT frame.
    #[error("connect rejected: {}", reason.as_deref().unwrap_or("no reason given"))]
    Rejected { reason: Option<String> },

    /// `send` was attempted while the connection is not established.
    #[error("not connected")]
    NotConnected,

    /// Reserved for stricter validation modes; the permissive parser in
    /// [`crate::parser`] never produces this.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

/// Result type alias for STOMP client operations.
pub type StompResult<T> = Result<T, StompError>;
