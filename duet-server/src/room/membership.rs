use duet_core::{ConnectionId, ParticipantId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub connection: ConnectionId,
    pub participant: ParticipantId,
}

/// Outcome of admitting a connection into a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomJoinResult {
    pub room: RoomId,
    pub member: Member,
    /// Members that were already present, in join order.
    pub peers: Vec<Member>,
}

impl RoomJoinResult {
    /// The other member, when the room now holds exactly two.
    pub fn counterpart(&self) -> Option<&Member> {
        match self.peers.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLeaveResult {
    pub room: RoomId,
    pub member: Member,
    pub remaining: Vec<Member>,
}
