use crate::signaling::SignalingOutput;
use duet_core::{ConnectionId, RelayedEvent, ServerEvent, SignalingError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Forwards peer-addressed signaling messages. Holds no state of its own.
#[derive(Clone)]
pub struct RelayDispatcher {
    output: Arc<dyn SignalingOutput>,
}

impl RelayDispatcher {
    pub fn new(output: Arc<dyn SignalingOutput>) -> Self {
        Self { output }
    }

    /// Deliver `relayed` to its addressee. If the addressee is gone the message is dropped
    /// and `from` is told with `call:failed`.
    pub async fn dispatch(
        &self,
        from: ConnectionId,
        relayed: RelayedEvent,
    ) -> Result<(), SignalingError> {
        let RelayedEvent { to, event } = relayed;
        let kind = event.kind();
        debug!("Relaying {} {} -> {}", kind, from, to);

        match self.output.send(&to, event).await {
            Ok(()) => Ok(()),
            Err(SignalingError::PeerUnreachable(peer)) => {
                warn!("Dropping {} from {}: {} is not connected", kind, from, peer);
                let failed = ServerEvent::CallFailed {
                    peer,
                    reason: "peer left".to_string(),
                };
                if let Err(e) = self.output.send(&from, failed).await {
                    debug!("Could not report call failure to {}: {}", from, e);
                }
                Err(SignalingError::PeerUnreachable(peer))
            }
            Err(e) => Err(e),
        }
    }
}
