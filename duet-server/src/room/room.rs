use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::room::room_command::RoomCommand;
use crate::room::room_manager::RoomHandle;
use crate::room::{Member, RoomJoinResult, RoomLeaveResult};
use crate::signaling::SignalingOutput;
use duet_core::{ConnectionId, ParticipantId, RoomId, ServerEvent};

/// Room actor.
///
/// Owns the member list of one room and processes joins and leaves one at a time, so
/// admission is atomic even when both participants join in the same instant.
pub struct Room {
    id: RoomId,

    /// Distinguishes this actor from a later room with the same name.
    epoch: u64,

    /// Members in join order.
    members: Vec<Member>,

    command_rx: mpsc::Receiver<RoomCommand>,

    signaling: Arc<dyn SignalingOutput>,

    /// Registry table, used to unregister when the room empties.
    registry: Arc<DashMap<RoomId, RoomHandle>>,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        epoch: u64,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
        registry: Arc<DashMap<RoomId, RoomHandle>>,
    ) -> Self {
        Self {
            id,
            epoch,
            members: Vec::new(),
            command_rx,
            signaling,
            registry,
        }
    }

    /// Main loop. Runs until the last member leaves, then unregisters the room.
    pub async fn run(mut self) {
        info!("Room '{}' event loop started", self.id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.members.is_empty() {
                // Unregister before the receiver is dropped: joins still queued here fail
                // their reply and are retried against a fresh room.
                self.registry
                    .remove_if(&self.id, |_, handle| handle.epoch == self.epoch);
                info!("Room '{}' is empty, dissolving", self.id);
                break;
            }
        }

        info!("Room '{}' event loop finished", self.id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                connection,
                participant,
                reply,
            } => {
                let result = self.admit(connection, participant).await;
                if reply.send(result).is_err() {
                    debug!("Join requester for {} went away", connection);
                }
            }

            RoomCommand::Leave { connection, reply } => {
                let result = self.remove(&connection).await;
                let _ = reply.send(result);
            }

            RoomCommand::Members { reply } => {
                let _ = reply.send(self.members.clone());
            }
        }
    }

    async fn admit(
        &mut self,
        connection: ConnectionId,
        participant: ParticipantId,
    ) -> RoomJoinResult {
        let member = Member {
            connection,
            participant,
        };

        if let Some(pos) = self.members.iter().position(|m| m.connection == connection) {
            // Re-join of the same room: confirm again, peers are not re-notified.
            self.members[pos].participant = member.participant.clone();
            self.confirm(&connection).await;
            return RoomJoinResult {
                room: self.id.clone(),
                member,
                peers: self.peers_of(&connection),
            };
        }

        let peers = self.members.clone();
        self.members.push(member.clone());
        info!(
            "{} ({}) joined room '{}' ({} member(s))",
            member.participant,
            connection,
            self.id,
            self.members.len()
        );

        self.confirm(&connection).await;

        // Only members already present learn about the joiner, which makes them the caller.
        for peer in &peers {
            let event = ServerEvent::UserJoined {
                email: member.participant.clone(),
                id: connection,
            };
            self.notify(&peer.connection, event).await;
        }

        RoomJoinResult {
            room: self.id.clone(),
            member,
            peers,
        }
    }

    async fn remove(&mut self, connection: &ConnectionId) -> Option<RoomLeaveResult> {
        let pos = self.members.iter().position(|m| &m.connection == connection)?;
        let member = self.members.remove(pos);
        info!(
            "{} ({}) left room '{}'",
            member.participant, member.connection, self.id
        );

        for peer in &self.members {
            let event = ServerEvent::UserLeft {
                email: member.participant.clone(),
                id: member.connection,
            };
            self.notify(&peer.connection, event).await;
        }

        Some(RoomLeaveResult {
            room: self.id.clone(),
            member,
            remaining: self.members.clone(),
        })
    }

    async fn confirm(&self, connection: &ConnectionId) {
        let event = ServerEvent::RoomJoined {
            room: self.id.clone(),
        };
        self.notify(connection, event).await;
    }

    async fn notify(&self, to: &ConnectionId, event: ServerEvent) {
        let kind = event.kind();
        if let Err(e) = self.signaling.send(to, event).await {
            warn!("Room '{}' could not deliver {} to {}: {}", self.id, kind, to, e);
        }
    }

    fn peers_of(&self, connection: &ConnectionId) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| &m.connection != connection)
            .cloned()
            .collect()
    }
}
