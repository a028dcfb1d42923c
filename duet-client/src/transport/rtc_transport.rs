use crate::media::{MediaTrack, RemoteTrack, TrackKind};
use crate::transport::{
    ConnectionState, PeerTransport, TransportConfig, TransportEvent, TransportEventSink,
    TransportFactory,
};
use anyhow::Result;
use async_trait::async_trait;
use duet_core::{
    ConnectionId, DescriptionSide, IceCandidate, SdpKind, SessionDescription, SignalingError,
    SignalingState,
};
use std::sync::Arc;
use tracing::{debug, info, trace};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// [`PeerTransport`] backed by a webrtc-rs peer connection.
pub struct RtcTransport {
    pub peer: ConnectionId,
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl RtcTransport {
    pub async fn new(config: &TransportConfig, events: TransportEventSink) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer = events.peer();
        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let nego_events = events.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            let events = nego_events.clone();
            Box::pin(async move {
                debug!("Negotiation needed for {}", events.peer());
                events.emit(TransportEvent::NegotiationNeeded);
            })
        }));

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let events = state_events.clone();
                Box::pin(async move {
                    info!("Peer connection state for {}: {}", events.peer(), s);
                    events.emit(TransportEvent::StateChanged(connection_state(s)));
                })
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                events.emit(TransportEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_events = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let events = track_events.clone();
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Video => TrackKind::Video,
                        _ => TrackKind::Audio,
                    };
                    let remote = RemoteTrack {
                        id: track.id(),
                        kind,
                        stream_id: track.stream_id(),
                    };
                    info!("Remote {} track {} from {}", kind, remote.id, events.peer());
                    events.emit(TransportEvent::Track(remote));

                    // Returning promptly releases the handler for the next track.
                    tokio::spawn(drain_track(events.peer(), track));
                })
            },
        ));

        Ok(Self {
            peer,
            peer_connection,
        })
    }

    /// Fail fast on an out-of-order description, before webrtc-rs sees it.
    fn check(&self, side: DescriptionSide, kind: SdpKind) -> Result<(), SignalingError> {
        self.signaling_state().apply(side, kind).map(|_| ())
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    fn signaling_state(&self) -> SignalingState {
        match self.peer_connection.signaling_state() {
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn create_offer(&self) -> Result<SessionDescription, SignalingError> {
        self.check(DescriptionSide::Local, SdpKind::Offer)?;
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(transport_error)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, SignalingError> {
        self.check(DescriptionSide::Local, SdpKind::Answer)?;
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(transport_error)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), SignalingError> {
        self.check(DescriptionSide::Local, desc.kind)?;
        let desc = to_rtc_description(desc)?;
        self.peer_connection
            .set_local_description(desc)
            .await
            .map_err(transport_error)
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), SignalingError> {
        self.check(DescriptionSide::Remote, desc.kind)?;
        let desc = to_rtc_description(desc)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(transport_error)
    }

    async fn add_track(&self, track: &MediaTrack) -> Result<(), SignalingError> {
        let local = Arc::clone(&track.local) as Arc<dyn TrackLocal + Send + Sync>;
        let rtp_sender = self
            .peer_connection
            .add_track(local)
            .await
            .map_err(transport_error)?;

        // RTCP has to be read for the interceptors to do their work.
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalingError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(transport_error)
    }

    async fn close(&self) -> Result<(), SignalingError> {
        self.peer_connection.close().await.map_err(transport_error)
    }
}

/// Opens [`RtcTransport`]s.
#[derive(Debug, Clone, Default)]
pub struct RtcTransportFactory;

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn open(
        &self,
        config: &TransportConfig,
        events: TransportEventSink,
    ) -> Result<Arc<dyn PeerTransport>, SignalingError> {
        let transport = RtcTransport::new(config, events)
            .await
            .map_err(|e| SignalingError::Transport(format!("{:#}", e)))?;
        Ok(Arc::new(transport))
    }
}

async fn drain_track(peer: ConnectionId, track: Arc<TrackRemote>) {
    let mut count = 0u64;
    while track.read_rtp().await.is_ok() {
        count += 1;
        if count % 500 == 0 {
            trace!("{}: received {} RTP packets on {}", peer, count, track.id());
        }
    }
    debug!("{}: track {} ended after {} packets", peer, track.id(), count);
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, SignalingError> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpKind::Pranswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpKind::Rollback => {
            let mut rollback = RTCSessionDescription::default();
            rollback.sdp_type = RTCSdpType::Rollback;
            return Ok(rollback);
        }
    };
    rtc.map_err(|e| SignalingError::Protocol(e.to_string()))
}

fn connection_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        _ => ConnectionState::New,
    }
}

fn transport_error(e: webrtc::Error) -> SignalingError {
    SignalingError::Transport(e.to_string())
}
