use crate::engine::{NegotiationEngine, NegotiationState};
use duet_core::{ConnectionId, SignalingError};
use tracing::debug;

impl NegotiationEngine {
    /// Manual "send stream": put the local tracks on a Connected session's transport.
    ///
    /// Repeating it with the same local media does nothing.
    pub async fn send_streams(&mut self, peer: ConnectionId) -> Result<(), SignalingError> {
        let result = match self
            .sessions
            .get_mut(&peer)
            .filter(|s| s.state == NegotiationState::Connected)
        {
            Some(session) => session.attach_local_tracks().await.map(|attached| {
                if !attached {
                    debug!("Local tracks already sent to {}", peer);
                }
            }),
            None => Err(self.unexpected(&peer, "send streams")),
        };

        self.report(peer, &result);
        result
    }
}
