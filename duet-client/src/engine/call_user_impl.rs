use crate::engine::{NegotiationEngine, NegotiationState};
use duet_core::{ClientEvent, SignalingError};
use tracing::{debug, info};

impl NegotiationEngine {
    /// Place a call to the known counterpart. A no-op when nobody else is in the room.
    pub async fn call_user(&mut self) -> Result<(), SignalingError> {
        let Some(counterpart) = self.counterpart.clone() else {
            debug!("No counterpart to call");
            return Ok(());
        };
        let peer = counterpart.id;

        if self.sessions.contains_key(&peer) {
            let err = self.unexpected(&peer, "call user");
            self.report(peer, &Err(err.clone()));
            return Err(err);
        }

        let local = self.acquire_media().await?;
        let session = self.open_session(peer, local, true).await?;

        let offer = async {
            let offer = session.transport.create_offer().await?;
            session.transport.set_local_description(offer.clone()).await?;
            Ok::<_, SignalingError>(offer)
        }
        .await;

        let offer = match offer {
            Ok(offer) => offer,
            Err(e) => {
                session.close().await;
                self.report(peer, &Err(e.clone()));
                return Err(e);
            }
        };

        info!("Calling {}", peer);
        self.sessions.insert(peer, session);
        self.set_state(&peer, NegotiationState::Offering);
        self.signal.emit(ClientEvent::UserCall { to: peer, offer }).await
    }
}
