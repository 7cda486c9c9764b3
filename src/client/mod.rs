// ABOUTME: STOMP client module providing trait-based interfaces for extensible client implementations
// ABOUTME: Exports all client components including traits, builders, error types, and default implementation

//! STOMP client module.
//!
//! This module provides a trait-based STOMP client implementation with the following features:
//!
//! * **Native async traits** - uses async fn in traits (no async_trait dependency)
//! * **Layered design** - separate traits for connection, session, and role-specific operations
//! * **Builder patterns** - easy client creation with sensible defaults
//! * **Extensible** - implement the traits for a custom client behavior
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stomp_client::client::{ClientBuilder, StompClient, StompTransmitter, SendMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = ClientBuilder::quick_connect("localhost:61613", "guest", "guest").await?;
//!
//! client.subscribe("0", "/queue/a", Default::default()).await?;
//!
//! let message = SendMessage::builder("/queue/a").text("Hello!").build();
//! client.send(&message).await?;
//!
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! * `StompConnection` - connect/disconnect lifecycle
//! * `StompClient` - subscribe/unsubscribe/ack/nack and the event pump
//! * `StompTransmitter` - sending messages (extends `StompClient`)
//! * `StompReceiver` - waiting for inbound messages (extends `StompClient`)
//! * `StompTransceiver` - combined send/receive operations (extends both)

pub mod builder;
pub mod default;
pub mod error;
pub mod traits;
pub mod types;

pub use builder::ClientBuilder;
pub use default::DefaultClient;
pub use error::{StompError, StompResult};
pub use traits::{StompClient, StompConnection, StompReceiver, StompTransceiver, StompTransmitter};
pub use types::{AckMode, ConnectOptions, SendMessage, SendMessageBuilder};
