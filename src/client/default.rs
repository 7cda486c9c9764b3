// ABOUTME: Default STOMP client implementation, wrapping a Connector with the
// ABOUTME: trait surface applications build against.

use crate::client::error::{StompError, StompResult};
use crate::client::traits::{StompClient, StompConnection, StompReceiver, StompTransmitter};
use crate::client::types::{AckMode, ConnectOptions, SendMessage};
use crate::connector::{Connector, ConnectorEvent};
use crate::frame::Frame;
use tokio::net::ToSocketAddrs;

/// Default STOMP client implementation: a thin, trait-conforming wrapper
/// around [`Connector`] that turns the CONNECT handshake and send helpers
/// into `Result`-returning calls for application code that doesn't want to
/// drive the event pump itself for the handshake.
pub struct DefaultClient {
    connector: Connector,
    connected: bool,
}

impl StompConnection for DefaultClient {
    #[tracing::instrument(skip(addr, options))]
    async fn connect<T>(addr: T, options: ConnectOptions) -> StompResult<Self>
    where
        T: ToSocketAddrs + Send + std::fmt::Debug,
    {
        let mut connector = Connector::connect(addr, options).await?;

        loop {
            match connector.next_event().await {
                ConnectorEvent::Ready { .. } => {
                    return Ok(DefaultClient {
                        connector,
                        connected: true,
                    });
                }
                ConnectorEvent::Rejected { reason } => {
                    return Err(StompError::Rejected { reason });
                }
                ConnectorEvent::Error(e) => return Err(StompError::Io(e)),
                ConnectorEvent::Disconnect { .. } => return Err(StompError::NotConnected),
                ConnectorEvent::Subscribe
                | ConnectorEvent::Message(_)
                | ConnectorEvent::Receipt { .. } => continue,
            }
        }
    }

    async fn disconnect(&mut self) -> StompResult<()> {
        self.connector.disconnect(true).await?;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl StompClient for DefaultClient {
    async fn subscribe(&mut self, id: &str, destination: &str, ack: AckMode) -> StompResult<()> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let frame = self.connector.subscribe_frame(id, destination, ack);
        self.connector.send(&frame).await?;
        Ok(())
    }

    async fn unsubscribe(&mut self, id: &str, destination: &str) -> StompResult<()> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let frame = self.connector.unsubscribe_frame(id, destination);
        self.connector.send(&frame).await?;
        Ok(())
    }

    async fn ack(&mut self, message: &Frame) -> StompResult<()> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let frame = self.connector.ack_frame(message);
        self.connector.send(&frame).await?;
        Ok(())
    }

    async fn nack(&mut self, message: &Frame) -> StompResult<()> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let frame = self.connector.nack_frame(message);
        self.connector.send(&frame).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> ConnectorEvent {
        self.connector.next_event().await
    }
}

impl StompTransmitter for DefaultClient {
    #[tracing::instrument(skip(self, message), fields(destination = %message.destination))]
    async fn send(&mut self, message: &SendMessage) -> StompResult<i64> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let mut frame = self.connector.send_frame(message.destination.clone());
        frame.set_body_slice(message.body.clone());
        frame.override_content_type(&message.mime, &message.encoding);
        frame.override_content_length();
        if message.receipt {
            self.connector.request_receipt(&mut frame);
        }
        let id = self.connector.send(&frame).await?;
        Ok(id)
    }
}

impl StompReceiver for DefaultClient {
    async fn receive_message(&mut self) -> StompResult<Frame> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        loop {
            match self.connector.next_event().await {
                ConnectorEvent::Message(frame) if frame.command() == "MESSAGE" => {
                    return Ok(frame);
                }
                ConnectorEvent::Disconnect { .. } => {
                    self.connected = false;
                    return Err(StompError::NotConnected);
                }
                ConnectorEvent::Error(e) => return Err(StompError::Io(e)),
                _ => continue,
            }
        }
    }
}
