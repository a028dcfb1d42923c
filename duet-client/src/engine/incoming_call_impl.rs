use crate::engine::{Counterpart, NegotiationEngine, NegotiationState};
use duet_core::{ClientEvent, ConnectionId, SessionDescription, SignalingError};
use tracing::info;

impl NegotiationEngine {
    /// Idle -> Answered.
    pub(super) async fn on_incoming_call(
        &mut self,
        from: ConnectionId,
        offer: SessionDescription,
    ) -> Result<(), SignalingError> {
        if self.sessions.contains_key(&from) {
            return Err(self.unexpected(&from, "accept incoming call"));
        }

        info!("Incoming call from {}", from);
        if self.counterpart.as_ref().is_none_or(|c| c.id != from) {
            self.counterpart = Some(Counterpart {
                id: from,
                email: None,
            });
        }

        let local = self.acquire_media().await?;
        let mut session = self.open_session(from, local, false).await?;

        let answer = async {
            session.set_remote(offer).await?;
            let answer = session.transport.create_answer().await?;
            session.transport.set_local_description(answer.clone()).await?;
            Ok::<_, SignalingError>(answer)
        }
        .await;

        let answer = match answer {
            Ok(answer) => answer,
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        };

        self.sessions.insert(from, session);
        self.set_state(&from, NegotiationState::Answered);
        self.signal
            .emit(ClientEvent::CallAccepted {
                to: from,
                ans: answer,
            })
            .await
    }

    /// Offering -> Connected. The caller's tracks go on the transport here, which is what
    /// triggers the first renegotiation.
    pub(super) async fn on_call_accepted(
        &mut self,
        from: ConnectionId,
        ans: SessionDescription,
    ) -> Result<(), SignalingError> {
        let Some(session) = self
            .sessions
            .get_mut(&from)
            .filter(|s| s.state == NegotiationState::Offering)
        else {
            return Err(self.unexpected(&from, "apply call:accepted"));
        };

        session.set_remote(ans).await?;
        info!("Call accepted by {}", from);
        self.set_state(&from, NegotiationState::Connected);

        if let Some(session) = self.sessions.get_mut(&from) {
            session.attach_local_tracks().await?;
        }
        self.resume_pending(from).await
    }
}
