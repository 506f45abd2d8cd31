// Project-wide update stream subscriber.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::transport::{ServerEvent, SocketTransport};

/// A live subscription to a project's update stream.
///
/// Yields events from the subscribed channels until the socket closes.
/// Dropping the stream disconnects.
pub struct EventStream {
    socket: Arc<dyn SocketTransport>,
    receiver: broadcast::Receiver<ServerEvent>,
    channels: Vec<String>,
}

impl EventStream {
    pub(crate) fn new(
        socket: Arc<dyn SocketTransport>,
        receiver: broadcast::Receiver<ServerEvent>,
        channels: Vec<String>,
    ) -> Self {
        Self { socket, receiver, channels }
    }

    /// Channels this stream yields.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Next event on one of the subscribed channels, or `None` once the
    /// socket closes.
    pub async fn next(&mut self) -> Option<ServerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.channels.iter().any(|name| *name == event.event) => {
                    return Some(event);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "project stream subscriber lagged, skipping");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Tears the subscription down.
    pub fn disconnect(&self) {
        self.socket.disconnect();
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.socket.disconnect();
    }
}
