use crate::media::RemoteTrack;
use duet_core::{ConnectionId, IceCandidate};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Notifications a transport raises on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Local tracks changed and a new offer/answer round is required.
    NegotiationNeeded,
    /// Inbound track surfaced by the remote side.
    Track(RemoteTrack),
    /// Locally gathered candidate to trickle to the counterpart.
    LocalCandidate(IceCandidate),
    StateChanged(ConnectionState),
}

/// A [`TransportEvent`] tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportNotification {
    pub peer: ConnectionId,
    pub epoch: u64,
    pub event: TransportEvent,
}

/// Handed to a transport when it is opened; every event it emits carries the session epoch.
#[derive(Debug, Clone)]
pub struct TransportEventSink {
    peer: ConnectionId,
    epoch: u64,
    tx: mpsc::UnboundedSender<TransportNotification>,
}

impl TransportEventSink {
    pub fn new(
        peer: ConnectionId,
        epoch: u64,
        tx: mpsc::UnboundedSender<TransportNotification>,
    ) -> Self {
        Self { peer, epoch, tx }
    }

    pub fn peer(&self) -> ConnectionId {
        self.peer
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns false once the engine is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(TransportNotification {
                peer: self.peer,
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }
}
