use crate::room::{Member, RoomJoinResult, RoomLeaveResult};
use duet_core::{ConnectionId, ParticipantId};
use tokio::sync::oneshot;

/// Commands a room actor receives from the registry.
#[derive(Debug)]
pub enum RoomCommand {
    /// Admit a connection; the reply lists who was already there.
    Join {
        connection: ConnectionId,
        participant: ParticipantId,
        reply: oneshot::Sender<RoomJoinResult>,
    },

    /// Explicit leave or transport disconnect.
    Leave {
        connection: ConnectionId,
        reply: oneshot::Sender<Option<RoomLeaveResult>>,
    },

    Members { reply: oneshot::Sender<Vec<Member>> },
}
