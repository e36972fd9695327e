use crate::error::ChannelError;
use async_trait::async_trait;
use huddle_core::Signal;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound half of a signaling connection.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queues one envelope. Fails with [`ChannelError::Closed`] once the
    /// connection is gone.
    async fn send(&self, signal: Signal) -> Result<(), ChannelError>;

    /// Closes the connection. Later sends fail.
    async fn close(&self);
}

/// Inbound side of a signaling connection, in arrival order.
#[derive(Debug)]
pub enum ChannelEvent {
    Message(Signal),
    /// Delivered at most once, as the last event. `None` for an orderly close.
    Closed(Option<ChannelError>),
}

#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn SignalingOutput>, mpsc::UnboundedReceiver<ChannelEvent>), ChannelError>;
}
