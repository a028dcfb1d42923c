use crate::media::{MediaTrack, RemoteTrack, TrackKind};
use crate::transport::{
    ConnectionState, PeerTransport, TransportConfig, TransportEvent, TransportEventSink,
    TransportFactory,
};
use async_trait::async_trait;
use duet_core::{
    ConnectionId, DescriptionSide, IceCandidate, SdpKind, SessionDescription, SignalingError,
    SignalingState,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackInfo {
    id: String,
    kind: TrackKind,
    stream_id: String,
}

#[derive(Default)]
struct SimulatedInner {
    state: SignalingState,
    local_tracks: Vec<TrackInfo>,
    /// Local track ids carried by an applied local description.
    negotiated: HashSet<String>,
    remote_tracks: HashSet<String>,
    has_remote: bool,
    has_local: bool,
    connected: bool,
    /// A NegotiationNeeded is outstanding until the next local offer.
    negotiation_flagged: bool,
    candidates: Vec<IceCandidate>,
    version: u64,
}

/// In-process transport.
///
/// Speaks a tiny text SDP (`a=track:<kind> <stream> <id>` per local track), enforces the
/// signaling state table and raises the same notifications a real peer connection would.
/// No media flows.
pub struct SimulatedTransport {
    session: u64,
    events: TransportEventSink,
    inner: Mutex<SimulatedInner>,
}

impl SimulatedTransport {
    pub fn new(events: TransportEventSink) -> Self {
        Self {
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            events,
            inner: Mutex::new(SimulatedInner::default()),
        }
    }

    pub fn peer(&self) -> ConnectionId {
        self.events.peer()
    }

    pub fn local_track_ids(&self) -> Vec<String> {
        self.lock().local_tracks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn remote_track_count(&self) -> usize {
        self.lock().remote_tracks.len()
    }

    /// Remote candidates applied so far.
    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.lock().candidates.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().state == SignalingState::Closed
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, inner: &mut SimulatedInner) -> String {
        inner.version += 1;
        let mut sdp = format!("v=0\no=duet-sim {} {}\n", self.session, inner.version);
        for track in &inner.local_tracks {
            sdp.push_str(&format!(
                "a=track:{} {} {}\n",
                track.kind, track.stream_id, track.id
            ));
        }
        sdp
    }

    /// Emits after the lock is released.
    fn after_stable(&self, inner: &mut SimulatedInner, out: &mut Vec<TransportEvent>) {
        if inner.state != SignalingState::Stable {
            return;
        }
        if !inner.connected && inner.has_local && inner.has_remote {
            inner.connected = true;
            out.push(TransportEvent::StateChanged(ConnectionState::Connected));
        }
        let pending = inner
            .local_tracks
            .iter()
            .any(|t| !inner.negotiated.contains(&t.id));
        if pending && !inner.negotiation_flagged {
            inner.negotiation_flagged = true;
            out.push(TransportEvent::NegotiationNeeded);
        }
    }

    fn flush(&self, out: Vec<TransportEvent>) {
        for event in out {
            self.events.emit(event);
        }
    }
}

#[async_trait]
impl PeerTransport for SimulatedTransport {
    fn signaling_state(&self) -> SignalingState {
        self.lock().state
    }

    async fn create_offer(&self) -> Result<SessionDescription, SignalingError> {
        let mut inner = self.lock();
        inner.state.apply(DescriptionSide::Local, SdpKind::Offer)?;
        Ok(SessionDescription::offer(self.render(&mut inner)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, SignalingError> {
        let mut inner = self.lock();
        if !inner.state.can_answer() {
            return Err(SignalingError::invalid_state(inner.state, "create answer"));
        }
        Ok(SessionDescription::answer(self.render(&mut inner)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), SignalingError> {
        let mut out = Vec::new();
        {
            let mut inner = self.lock();
            inner.state = inner.state.apply(DescriptionSide::Local, desc.kind)?;
            for track in parse_tracks(&desc.sdp) {
                inner.negotiated.insert(track.id);
            }
            if desc.kind == SdpKind::Offer {
                inner.negotiation_flagged = false;
            }
            if !inner.has_local {
                inner.has_local = true;
                out.push(TransportEvent::StateChanged(ConnectionState::Connecting));
                out.push(TransportEvent::LocalCandidate(IceCandidate {
                    candidate: format!(
                        "candidate:{} 1 udp 2130706431 127.0.0.1 {} typ host",
                        self.session,
                        40000 + self.session % 20000
                    ),
                    sdp_mid: Some("0".to_string()),
                    sdp_m_line_index: Some(0),
                    username_fragment: None,
                }));
            }
            self.after_stable(&mut inner, &mut out);
        }
        self.flush(out);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), SignalingError> {
        let mut out = Vec::new();
        {
            let mut inner = self.lock();
            inner.state = inner.state.apply(DescriptionSide::Remote, desc.kind)?;
            inner.has_remote = true;
            for track in parse_tracks(&desc.sdp) {
                if inner.remote_tracks.insert(track.id.clone()) {
                    out.push(TransportEvent::Track(RemoteTrack {
                        id: track.id,
                        kind: track.kind,
                        stream_id: track.stream_id,
                    }));
                }
            }
            self.after_stable(&mut inner, &mut out);
        }
        self.flush(out);
        Ok(())
    }

    async fn add_track(&self, track: &MediaTrack) -> Result<(), SignalingError> {
        let mut out = Vec::new();
        {
            let mut inner = self.lock();
            if inner.state == SignalingState::Closed {
                return Err(SignalingError::invalid_state(inner.state, "add track"));
            }
            if inner.local_tracks.iter().any(|t| t.id == track.id) {
                return Err(SignalingError::Transport(format!(
                    "track {} already added",
                    track.id
                )));
            }
            inner.local_tracks.push(TrackInfo {
                id: track.id.clone(),
                kind: track.kind,
                stream_id: track.stream_id.clone(),
            });
            self.after_stable(&mut inner, &mut out);
        }
        self.flush(out);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalingError> {
        let mut inner = self.lock();
        if !inner.has_remote {
            return Err(SignalingError::invalid_state(
                inner.state,
                "add ice candidate without a remote description",
            ));
        }
        inner.candidates.push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<(), SignalingError> {
        {
            let mut inner = self.lock();
            if inner.state == SignalingState::Closed {
                return Ok(());
            }
            inner.state = SignalingState::Closed;
        }
        debug!("Simulated transport to {} closed", self.peer());
        self.events
            .emit(TransportEvent::StateChanged(ConnectionState::Closed));
        Ok(())
    }
}

/// Opens [`SimulatedTransport`]s and remembers them for inspection.
#[derive(Clone, Default)]
pub struct SimulatedTransportFactory {
    opened: Arc<Mutex<Vec<Arc<SimulatedTransport>>>>,
}

impl SimulatedTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened_count(&self) -> usize {
        self.lock().len()
    }

    /// Most recently opened transport towards `peer`.
    pub fn latest_for(&self, peer: &ConnectionId) -> Option<Arc<SimulatedTransport>> {
        self.lock()
            .iter()
            .rev()
            .find(|t| &t.peer() == peer)
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<SimulatedTransport>>> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TransportFactory for SimulatedTransportFactory {
    async fn open(
        &self,
        _config: &TransportConfig,
        events: TransportEventSink,
    ) -> Result<Arc<dyn PeerTransport>, SignalingError> {
        let transport = Arc::new(SimulatedTransport::new(events));
        self.lock().push(transport.clone());
        Ok(transport)
    }
}

fn parse_tracks(sdp: &str) -> Vec<TrackInfo> {
    sdp.lines()
        .filter_map(|line| line.strip_prefix("a=track:"))
        .filter_map(|rest| {
            let mut parts = rest.split_whitespace();
            let kind = match parts.next()? {
                "audio" => TrackKind::Audio,
                "video" => TrackKind::Video,
                _ => return None,
            };
            Some(TrackInfo {
                kind,
                stream_id: parts.next()?.to_string(),
                id: parts.next()?.to_string(),
            })
        })
        .collect()
}
