use crate::engine::{Counterpart, EngineEvent, NegotiationEngine};
use duet_core::{ServerEvent, SignalingError};
use tracing::{debug, info, warn};

impl NegotiationEngine {
    /// Apply one inbound server event.
    ///
    /// Per-session failures are also reported as [`EngineEvent::SessionError`]; they never
    /// leave the engine unusable.
    pub async fn handle_signal(&mut self, event: ServerEvent) -> Result<(), SignalingError> {
        let peer = event.relayed_from();

        let result = match event {
            ServerEvent::IceConfig { ice_servers } => {
                info!("Received ICE config: {} server(s)", ice_servers.len());
                self.config.transport.ice_servers = ice_servers;
                Ok(())
            }

            ServerEvent::RoomJoined { room } => {
                info!("Joined room '{}'", room);
                self.emit_event(EngineEvent::Joined(room));
                Ok(())
            }

            ServerEvent::UserJoined { email, id } => {
                info!("{} ({}) joined the room", email, id);
                self.counterpart = Some(Counterpart {
                    id,
                    email: Some(email.clone()),
                });
                self.emit_event(EngineEvent::PeerJoined { peer: id, email });
                if self.config.auto_call {
                    self.call_user().await
                } else {
                    Ok(())
                }
            }

            ServerEvent::UserLeft { email, id } => {
                info!("{} ({}) left the room", email, id);
                self.discard_session(&id).await;
                if self.counterpart.as_ref().is_some_and(|c| c.id == id) {
                    self.counterpart = None;
                }
                self.emit_event(EngineEvent::PeerLeft { peer: id, email });
                Ok(())
            }

            ServerEvent::IncomingCall { from, offer } => self.on_incoming_call(from, offer).await,

            ServerEvent::CallAccepted { from, ans } => self.on_call_accepted(from, ans).await,

            ServerEvent::NegoNeeded { from, offer } => self.on_remote_renegotiation(from, offer).await,

            ServerEvent::NegoFinal { from, ans } => self.on_renegotiation_final(from, ans).await,

            ServerEvent::IceCandidate { from, candidate } => match self.sessions.get_mut(&from) {
                Some(session) => session.add_remote_candidate(candidate).await,
                None => Err(self.unexpected(&from, "add ice candidate")),
            },

            ServerEvent::CallFailed { peer, reason } => {
                warn!("Call to {} failed: {}", peer, reason);
                self.discard_session(&peer).await;
                if self.counterpart.as_ref().is_some_and(|c| c.id == peer) {
                    self.counterpart = None;
                }
                self.emit_event(EngineEvent::CallFailed { peer, reason });
                Ok(())
            }

            ServerEvent::Error { message } => {
                warn!("Server error: {}", message);
                self.emit_event(EngineEvent::ServerError(message));
                Ok(())
            }
        };

        match (peer, &result) {
            (Some(peer), Err(_)) => self.report(peer, &result),
            (None, Err(e)) => debug!("Signal handling failed: {}", e),
            _ => {}
        }
        result
    }
}
