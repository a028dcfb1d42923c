use crate::media::{MediaHandle, RemoteMedia};
use crate::transport::PeerTransport;
use duet_core::{ConnectionId, IceCandidate, SessionDescription, SignalingError, SignalingState};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    /// Initial offer sent, waiting for `call:accepted`.
    Offering,
    /// Initial answer sent, waiting for the caller's renegotiation.
    Answered,
    Connected,
    /// Renegotiation offer sent, waiting for `peer:nego:final`.
    Renegotiating,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::Idle => "idle",
            NegotiationState::Offering => "offering",
            NegotiationState::Answered => "answered",
            NegotiationState::Connected => "connected",
            NegotiationState::Renegotiating => "renegotiating",
        };
        f.write_str(name)
    }
}

/// Negotiation with one counterpart.
pub struct NegotiationSession {
    pub(super) peer: ConnectionId,
    pub(super) epoch: u64,
    pub(super) state: NegotiationState,
    pub(super) transport: Arc<dyn PeerTransport>,
    pub(super) local: MediaHandle,
    pub(super) remote: RemoteMedia,
    /// Id of the local handle whose tracks are all on the transport.
    pub(super) attached: Option<String>,
    /// Tracks already handed to the transport, including those of an interrupted attach.
    pub(super) sent_tracks: HashSet<String>,
    pub(super) renegotiation_pending: bool,
    pub(super) pending_candidates: Vec<IceCandidate>,
    pub(super) remote_description_set: bool,
    pub(super) initiator: bool,
}

impl NegotiationSession {
    pub(super) fn new(
        peer: ConnectionId,
        epoch: u64,
        transport: Arc<dyn PeerTransport>,
        local: MediaHandle,
        initiator: bool,
    ) -> Self {
        Self {
            peer,
            epoch,
            state: NegotiationState::Idle,
            transport,
            local,
            remote: RemoteMedia::default(),
            attached: None,
            sent_tracks: HashSet::new(),
            renegotiation_pending: false,
            pending_candidates: Vec::new(),
            remote_description_set: false,
            initiator,
        }
    }

    pub fn peer(&self) -> ConnectionId {
        self.peer
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.transport.signaling_state()
    }

    pub fn local_media(&self) -> &MediaHandle {
        &self.local
    }

    pub fn remote_media(&self) -> &RemoteMedia {
        &self.remote
    }

    pub fn attached_handle(&self) -> Option<&str> {
        self.attached.as_deref()
    }

    pub fn is_renegotiation_pending(&self) -> bool {
        self.renegotiation_pending
    }

    pub fn queued_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    /// True on the side that placed the call.
    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    /// Apply a remote description, then flush candidates that arrived ahead of it.
    pub(super) async fn set_remote(&mut self, desc: SessionDescription) -> Result<(), SignalingError> {
        self.transport.set_remote_description(desc).await?;
        self.remote_description_set = true;

        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                warn!("Dropping queued candidate for {}: {}", self.peer, e);
            }
        }
        Ok(())
    }

    pub(super) async fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError> {
        if !self.remote_description_set {
            debug!("Queueing candidate from {} until a remote description", self.peer);
            self.pending_candidates.push(candidate);
            return Ok(());
        }
        self.transport.add_ice_candidate(candidate).await
    }

    /// Put the local tracks on the transport, at most once per local handle.
    ///
    /// A failed attempt can be repeated: tracks that made it onto the transport are skipped.
    /// Returns false if everything was already attached.
    pub(super) async fn attach_local_tracks(&mut self) -> Result<bool, SignalingError> {
        if self.attached.as_deref() == Some(self.local.id.as_str()) {
            return Ok(false);
        }

        for track in &self.local.tracks {
            if self.sent_tracks.contains(&track.id) {
                continue;
            }
            self.transport.add_track(track).await?;
            self.sent_tracks.insert(track.id.clone());
        }
        self.attached = Some(self.local.id.clone());
        debug!(
            "Attached {} local track(s) for {}",
            self.local.tracks.len(),
            self.peer
        );
        Ok(true)
    }

    pub(super) async fn close(&self) {
        if let Err(e) = self.transport.close().await {
            warn!("Closing transport to {} failed: {}", self.peer, e);
        }
    }
}
