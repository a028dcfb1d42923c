use crate::model::{ConnectionId, RoomId};
use thiserror::Error;

/// Failures shared by the relay server and the negotiation engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalingError {
    /// Room admission failed. Membership is unbounded, so this only happens when a join
    /// keeps racing the room's dissolution.
    #[error("room '{0}' is not joinable")]
    RoomNotJoinable(RoomId),

    /// Permission denied or no capture device. Surfaced to the user, never retried.
    #[error("local media unavailable: {0}")]
    MediaUnavailable(String),

    /// Negotiation step out of order for the current state.
    #[error("invalid signaling state: cannot {operation} while {state}")]
    InvalidSignalingState { state: String, operation: String },

    /// Relay target is not connected.
    #[error("peer {0} is unreachable")]
    PeerUnreachable(ConnectionId),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("signaling channel closed")]
    ChannelClosed,
}

impl SignalingError {
    pub fn invalid_state(state: impl ToString, operation: impl Into<String>) -> Self {
        Self::InvalidSignalingState {
            state: state.to_string(),
            operation: operation.into(),
        }
    }
}
