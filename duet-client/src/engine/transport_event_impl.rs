use crate::engine::{EngineEvent, NegotiationEngine};
use crate::media::{BoundMedia, Surface};
use crate::transport::{TransportEvent, TransportNotification};
use duet_core::{ClientEvent, SignalingError};
use tracing::{debug, trace};

impl NegotiationEngine {
    /// Apply one transport notification. Notifications from a discarded session are dropped.
    pub async fn handle_transport_event(
        &mut self,
        notification: TransportNotification,
    ) -> Result<(), SignalingError> {
        let TransportNotification { peer, epoch, event } = notification;

        let current = self.sessions.get(&peer).map(|s| s.epoch);
        if current != Some(epoch) {
            trace!("Ignoring stale transport event for {} (epoch {})", peer, epoch);
            return Ok(());
        }

        let result = match event {
            TransportEvent::NegotiationNeeded => self.on_negotiation_needed(peer).await,

            TransportEvent::Track(track) => {
                let Some(session) = self.sessions.get_mut(&peer) else {
                    return Ok(());
                };
                if session.remote.add(track) {
                    let media = session.remote.clone();
                    debug!("Remote media from {} now has {} track(s)", peer, media.len());
                    self.bind(Surface::Remote(peer), BoundMedia::Remote(media.clone()));
                    self.emit_event(EngineEvent::RemoteMedia { peer, media });
                }
                Ok(())
            }

            TransportEvent::LocalCandidate(candidate) => {
                self.signal
                    .emit(ClientEvent::IceCandidate {
                        to: peer,
                        candidate,
                    })
                    .await
            }

            TransportEvent::StateChanged(state) => {
                debug!("Transport to {} is {}", peer, state);
                self.emit_event(EngineEvent::TransportState { peer, state });
                Ok(())
            }
        };

        self.report(peer, &result);
        result
    }

    /// Process every transport notification already queued. Returns how many were handled.
    pub async fn drain_transport_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(notification) = self.transport_rx.try_recv() {
            let _ = self.handle_transport_event(notification).await;
            handled += 1;
        }
        handled
    }
}
