// Socket collaborator: request/response RPC plus a multiplexed event feed.
//
// The socket.io framing and handshake live outside the core; production
// transports wrap them, tests script mocks against these traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use pagesync_common::protocol::RequestEnvelope;

use crate::error::Error;

/// One event delivered on a multiplexed socket channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event: String,
    pub payload: Value,
}

/// A connected duplex socket.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    /// Round-trips an envelope on the request channel.
    ///
    /// Server rejections and lost connections surface as
    /// [`Error::Transport`].
    async fn request(&self, envelope: RequestEnvelope) -> Result<Value, Error>;

    /// Subscribes to the socket's event feed.
    ///
    /// Every subscriber sees every event; the feed closes when the socket
    /// disconnects.
    fn subscribe(&self) -> broadcast::Receiver<ServerEvent>;

    /// Tears the connection down. In-flight requests fail.
    fn disconnect(&self);
}

/// Opens sockets to the collaboration server.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn SocketTransport>, Error>;
}
