use crate::engine::{NegotiationEngine, NegotiationState};
use duet_core::{ClientEvent, ConnectionId, SessionDescription, SignalingError, SignalingState};
use tracing::{debug, info};

impl NegotiationEngine {
    /// The transport wants a new offer/answer round.
    ///
    /// Only a Connected session with a stable transport offers right away; anywhere else the
    /// request is parked and replayed once the session is back in Connected.
    pub(super) async fn on_negotiation_needed(
        &mut self,
        peer: ConnectionId,
    ) -> Result<(), SignalingError> {
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Ok(());
        };

        let ready = session.state == NegotiationState::Connected
            && session.transport.signaling_state() == SignalingState::Stable;
        if !ready {
            debug!(
                "Deferring renegotiation with {} ({}, {})",
                peer,
                session.state,
                session.transport.signaling_state()
            );
            session.renegotiation_pending = true;
            return Ok(());
        }

        self.start_renegotiation(peer).await
    }

    async fn start_renegotiation(&mut self, peer: ConnectionId) -> Result<(), SignalingError> {
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Ok(());
        };

        session.renegotiation_pending = false;
        let offer = session.transport.create_offer().await?;
        session.transport.set_local_description(offer.clone()).await?;

        info!("Renegotiating with {}", peer);
        self.set_state(&peer, NegotiationState::Renegotiating);
        self.signal
            .emit(ClientEvent::NegoNeeded { to: peer, offer })
            .await
    }

    /// Counterpart's renegotiation offer. Answered moves to Connected here and attaches its
    /// own tracks before answering, so the answer carries them.
    ///
    /// Glare is not resolved: an offer that arrives while this side is Renegotiating is
    /// rejected, and the two sessions stay stuck until one side discards its session.
    pub(super) async fn on_remote_renegotiation(
        &mut self,
        from: ConnectionId,
        offer: SessionDescription,
    ) -> Result<(), SignalingError> {
        let Some(session) = self.sessions.get_mut(&from).filter(|s| {
            matches!(
                s.state,
                NegotiationState::Answered | NegotiationState::Connected
            )
        }) else {
            return Err(self.unexpected(&from, "apply peer:nego:needed"));
        };

        session.set_remote(offer).await?;
        if session.state == NegotiationState::Answered {
            self.set_state(&from, NegotiationState::Connected);
            if let Some(session) = self.sessions.get_mut(&from) {
                session.attach_local_tracks().await?;
            }
        }

        let Some(session) = self.sessions.get_mut(&from) else {
            return Ok(());
        };
        let answer = session.transport.create_answer().await?;
        session.transport.set_local_description(answer.clone()).await?;

        self.signal
            .emit(ClientEvent::NegoDone {
                to: from,
                ans: answer,
            })
            .await?;
        self.resume_pending(from).await
    }

    /// Renegotiating -> Connected.
    pub(super) async fn on_renegotiation_final(
        &mut self,
        from: ConnectionId,
        ans: SessionDescription,
    ) -> Result<(), SignalingError> {
        let Some(session) = self
            .sessions
            .get_mut(&from)
            .filter(|s| s.state == NegotiationState::Renegotiating)
        else {
            return Err(self.unexpected(&from, "apply peer:nego:final"));
        };

        session.set_remote(ans).await?;
        self.set_state(&from, NegotiationState::Connected);
        self.resume_pending(from).await
    }

    /// Replay a parked renegotiation request if the session can take it now.
    pub(super) async fn resume_pending(&mut self, peer: ConnectionId) -> Result<(), SignalingError> {
        let replay = self.sessions.get(&peer).is_some_and(|s| {
            s.renegotiation_pending
                && s.state == NegotiationState::Connected
                && s.transport.signaling_state() == SignalingState::Stable
        });

        if replay {
            debug!("Replaying deferred renegotiation with {}", peer);
            self.start_renegotiation(peer).await
        } else {
            Ok(())
        }
    }
}
