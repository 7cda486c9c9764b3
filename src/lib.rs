//! A client library for the STOMP 1.0/1.1 text framing protocol.
//!
//! Four layers, leaves first:
//!
//! * [`frame`] — in-memory representation of one STOMP frame.
//! * [`parser`] — a push-driven byte-level state machine that turns a byte
//!   stream into completed [`frame::Frame`]s.
//! * [`connection`] — adapts a TCP socket into a frame-oriented event stream.
//! * [`connector`] — the session-level state machine that drives the
//!   CONNECT/CONNECTED handshake and builds SUBSCRIBE/SEND/ACK/NACK frames.
//!
//! Most applications should start with [`client::ClientBuilder`], which
//! drives the handshake and returns a client implementing [`client::StompClient`].
//!
//! ```rust,no_run
//! use stomp_client::client::{ClientBuilder, StompClient, StompTransmitter, SendMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = ClientBuilder::quick_connect("localhost:61613", "guest", "guest").await?;
//!
//!     client.subscribe("0", "/queue/a", Default::default()).await?;
//!
//!     let message = SendMessage::builder("/queue/a").text("Hello, world!").build();
//!     client.send(&message).await?;
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod body;
pub mod client;
pub mod connection;
pub mod connector;
pub mod frame;
pub mod parser;

pub use client::{ClientBuilder, SendMessage, StompClient, StompError, StompResult, StompTransmitter};
pub use connector::{AckMode, ConnectOptions, Connector, ConnectorEvent};
pub use frame::Frame;
