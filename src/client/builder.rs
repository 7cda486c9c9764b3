// ABOUTME: Client factory and builder patterns for easy STOMP client creation,
// ABOUTME: handling connect-plus-handshake in a single call.

use crate::client::default::DefaultClient;
use crate::client::error::StompResult;
use crate::client::traits::StompConnection;
use crate::client::types::ConnectOptions;
use tokio::net::ToSocketAddrs;

/// Factory for creating a [`DefaultClient`] already past the CONNECT/CONNECTED
/// handshake.
pub struct ClientBuilder;

impl ClientBuilder {
    /// Connect and complete the handshake with the given options.
    pub async fn connect<T: ToSocketAddrs + Send + std::fmt::Debug>(
        addr: T,
        options: ConnectOptions,
    ) -> StompResult<DefaultClient> {
        DefaultClient::connect(addr, options).await
    }

    /// Connect with just a username and password, defaulting the virtual
    /// host to `"localhost"` (see [`crate::frame::DEFAULT_HOST`]).
    pub async fn quick_connect<T: ToSocketAddrs + Send + std::fmt::Debug>(
        addr: T,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> StompResult<DefaultClient> {
        let options = ConnectOptions::new().with_credentials(username, password);
        Self::connect(addr, options).await
    }
}
