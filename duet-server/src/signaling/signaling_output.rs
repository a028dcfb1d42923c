use duet_core::{ConnectionId, ServerEvent, SignalingError};
use async_trait::async_trait;

/// Outbound half of the signaling channel.
///
/// Rooms and the relay only ever talk to connections through this trait, so tests can
/// swap the websocket fan-out for a recorder.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver `event` to a single connection.
    ///
    /// Fails with [`SignalingError::PeerUnreachable`] if the connection is gone.
    async fn send(&self, to: &ConnectionId, event: ServerEvent) -> Result<(), SignalingError>;
}
