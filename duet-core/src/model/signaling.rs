use crate::model::{
    ConnectionId, IceCandidate, IceServerConfig, ParticipantId, RoomId, SessionDescription,
};
use serde::{Deserialize, Serialize};

/// Messages a client sends to the signaling server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:join")]
    RoomJoin { email: ParticipantId, room: RoomId },

    #[serde(rename = "room:leave")]
    RoomLeave,

    #[serde(rename = "user:call")]
    UserCall {
        to: ConnectionId,
        offer: SessionDescription,
    },

    #[serde(rename = "call:accepted")]
    CallAccepted {
        to: ConnectionId,
        ans: SessionDescription,
    },

    #[serde(rename = "peer:nego:needed")]
    NegoNeeded {
        to: ConnectionId,
        offer: SessionDescription,
    },

    #[serde(rename = "peer:nego:done")]
    NegoDone {
        to: ConnectionId,
        ans: SessionDescription,
    },

    #[serde(rename = "peer:ice")]
    IceCandidate {
        to: ConnectionId,
        candidate: IceCandidate,
    },
}

/// Messages the signaling server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "ice:config")]
    IceConfig { ice_servers: Vec<IceServerConfig> },

    /// Confirmation sent to the joiner only.
    #[serde(rename = "room:joined")]
    RoomJoined { room: RoomId },

    /// Sent to members already present when someone joins.
    #[serde(rename = "user:joined")]
    UserJoined {
        email: ParticipantId,
        id: ConnectionId,
    },

    #[serde(rename = "user:left")]
    UserLeft {
        email: ParticipantId,
        id: ConnectionId,
    },

    #[serde(rename = "incoming:call")]
    IncomingCall {
        from: ConnectionId,
        offer: SessionDescription,
    },

    #[serde(rename = "call:accepted")]
    CallAccepted {
        from: ConnectionId,
        ans: SessionDescription,
    },

    #[serde(rename = "peer:nego:needed")]
    NegoNeeded {
        from: ConnectionId,
        offer: SessionDescription,
    },

    #[serde(rename = "peer:nego:final")]
    NegoFinal {
        from: ConnectionId,
        ans: SessionDescription,
    },

    #[serde(rename = "peer:ice")]
    IceCandidate {
        from: ConnectionId,
        candidate: IceCandidate,
    },

    /// The relay target was gone; the message was dropped.
    #[serde(rename = "call:failed")]
    CallFailed { peer: ConnectionId, reason: String },

    #[serde(rename = "error")]
    Error { message: String },
}

/// A client message rewritten for delivery to its addressee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedEvent {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::RoomJoin { .. } => "room:join",
            ClientEvent::RoomLeave => "room:leave",
            ClientEvent::UserCall { .. } => "user:call",
            ClientEvent::CallAccepted { .. } => "call:accepted",
            ClientEvent::NegoNeeded { .. } => "peer:nego:needed",
            ClientEvent::NegoDone { .. } => "peer:nego:done",
            ClientEvent::IceCandidate { .. } => "peer:ice",
        }
    }

    /// Swap the `to` address for the sender's `from` address.
    ///
    /// Registry requests (`room:join`, `room:leave`) are not relayed and come back as `Err`.
    pub fn into_relayed(self, from: ConnectionId) -> Result<RelayedEvent, ClientEvent> {
        let (to, event) = match self {
            ClientEvent::UserCall { to, offer } => (to, ServerEvent::IncomingCall { from, offer }),
            ClientEvent::CallAccepted { to, ans } => (to, ServerEvent::CallAccepted { from, ans }),
            ClientEvent::NegoNeeded { to, offer } => (to, ServerEvent::NegoNeeded { from, offer }),
            ClientEvent::NegoDone { to, ans } => (to, ServerEvent::NegoFinal { from, ans }),
            ClientEvent::IceCandidate { to, candidate } => {
                (to, ServerEvent::IceCandidate { from, candidate })
            }
            other @ (ClientEvent::RoomJoin { .. } | ClientEvent::RoomLeave) => return Err(other),
        };
        Ok(RelayedEvent { to, event })
    }
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::IceConfig { .. } => "ice:config",
            ServerEvent::RoomJoined { .. } => "room:joined",
            ServerEvent::UserJoined { .. } => "user:joined",
            ServerEvent::UserLeft { .. } => "user:left",
            ServerEvent::IncomingCall { .. } => "incoming:call",
            ServerEvent::CallAccepted { .. } => "call:accepted",
            ServerEvent::NegoNeeded { .. } => "peer:nego:needed",
            ServerEvent::NegoFinal { .. } => "peer:nego:final",
            ServerEvent::IceCandidate { .. } => "peer:ice",
            ServerEvent::CallFailed { .. } => "call:failed",
            ServerEvent::Error { .. } => "error",
        }
    }

    /// Sender of a relayed negotiation message.
    pub fn relayed_from(&self) -> Option<ConnectionId> {
        match self {
            ServerEvent::IncomingCall { from, .. }
            | ServerEvent::CallAccepted { from, .. }
            | ServerEvent::NegoNeeded { from, .. }
            | ServerEvent::NegoFinal { from, .. }
            | ServerEvent::IceCandidate { from, .. } => Some(*from),
            _ => None,
        }
    }
}
