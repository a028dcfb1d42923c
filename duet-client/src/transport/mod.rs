mod rtc_transport;
mod simulated;
mod transport_config;
mod transport_event;

pub use rtc_transport::*;
pub use simulated::*;
pub use transport_config::*;
pub use transport_event::*;

use crate::media::MediaTrack;
use async_trait::async_trait;
use duet_core::{IceCandidate, SessionDescription, SignalingError, SignalingState};
use std::sync::Arc;

/// One real-time connection to one counterpart.
///
/// Description operations issued out of order fail with
/// [`SignalingError::InvalidSignalingState`] and leave the transport untouched.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    fn signaling_state(&self) -> SignalingState;

    async fn create_offer(&self) -> Result<SessionDescription, SignalingError>;

    async fn create_answer(&self) -> Result<SessionDescription, SignalingError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), SignalingError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), SignalingError>;

    async fn add_track(&self, track: &MediaTrack) -> Result<(), SignalingError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalingError>;

    async fn close(&self) -> Result<(), SignalingError>;
}

/// Opens transports. The engine owns one per counterpart and never shares them.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(
        &self,
        config: &TransportConfig,
        events: TransportEventSink,
    ) -> Result<Arc<dyn PeerTransport>, SignalingError>;
}
