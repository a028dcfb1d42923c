mod ws_client;

pub use ws_client::*;

use async_trait::async_trait;
use duet_core::{ClientEvent, SignalingError};
use tokio::sync::mpsc;

/// Outbound side of the signaling connection.
#[async_trait]
pub trait SignalChannel: Send + Sync {
    async fn emit(&self, event: ClientEvent) -> Result<(), SignalingError>;
}

/// [`SignalChannel`] that queues events on an unbounded channel.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl SignalSender {
    pub fn new(tx: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl SignalChannel for SignalSender {
    async fn emit(&self, event: ClientEvent) -> Result<(), SignalingError> {
        self.tx.send(event).map_err(|_| SignalingError::ChannelClosed)
    }
}
