use crate::room::{Member, Room, RoomCommand, RoomJoinResult, RoomLeaveResult};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use duet_core::{ConnectionId, ParticipantId, RoomId, SignalingError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// How many times a join is retried when it races the room's dissolution.
const JOIN_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub(crate) struct RoomHandle {
    pub(crate) epoch: u64,
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

#[derive(Debug, Clone)]
struct Membership {
    participant: ParticipantId,
    room: RoomId,
}

/// Connection registry.
///
/// Maps connections to their participant and room, and rooms to the actor that owns their
/// member list. Rooms are spawned on first join and unregister themselves when empty.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, RoomHandle>>,
    memberships: Arc<DashMap<ConnectionId, Membership>>,
    signaling: Arc<dyn SignalingOutput>,
    next_epoch: Arc<AtomicU64>,
    command_capacity: usize,
}

impl RoomManager {
    pub fn new(signaling: Arc<dyn SignalingOutput>) -> Self {
        Self::with_capacity(signaling, 100)
    }

    pub fn with_capacity(signaling: Arc<dyn SignalingOutput>, command_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            memberships: Arc::new(DashMap::new()),
            signaling,
            next_epoch: Arc::new(AtomicU64::new(0)),
            command_capacity: command_capacity.max(1),
        }
    }

    /// Admit `connection` into `room`, leaving its current room first if it is elsewhere.
    pub async fn join(
        &self,
        connection: ConnectionId,
        participant: ParticipantId,
        room: RoomId,
    ) -> Result<RoomJoinResult, SignalingError> {
        if let Some(current) = self.room_of(&connection) {
            if current != room {
                debug!("{} moves from '{}' to '{}'", connection, current, room);
                self.leave(&connection).await;
            }
        }

        // Recorded before admission so a disconnect racing this join still finds the room.
        self.memberships.insert(
            connection,
            Membership {
                participant: participant.clone(),
                room: room.clone(),
            },
        );

        for attempt in 1..=JOIN_ATTEMPTS {
            let handle = self.room_handle(&room);
            let (reply_tx, reply_rx) = oneshot::channel();
            let cmd = RoomCommand::Join {
                connection,
                participant: participant.clone(),
                reply: reply_tx,
            };

            if handle.tx.send(cmd).await.is_err() {
                debug!("Room '{}' closed before join (attempt {})", room, attempt);
                continue;
            }

            match reply_rx.await {
                Ok(result) => return Ok(result),
                Err(_) => debug!("Room '{}' dissolved during join (attempt {})", room, attempt),
            }
        }

        self.memberships.remove(&connection);
        warn!("Giving up on joining {} into '{}'", connection, room);
        Err(SignalingError::RoomNotJoinable(room))
    }

    /// Remove `connection` from its room. Safe to call any number of times.
    pub async fn leave(&self, connection: &ConnectionId) -> Option<RoomLeaveResult> {
        let (_, membership) = self.memberships.remove(connection)?;
        let tx = self
            .rooms
            .get(&membership.room)
            .map(|handle| handle.tx.clone())?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Leave {
            connection: *connection,
            reply: reply_tx,
        };
        tx.send(cmd).await.ok()?;
        reply_rx.await.ok().flatten()
    }

    pub fn room_of(&self, connection: &ConnectionId) -> Option<RoomId> {
        self.memberships
            .get(connection)
            .map(|membership| membership.room.clone())
    }

    pub fn participant_of(&self, connection: &ConnectionId) -> Option<ParticipantId> {
        self.memberships
            .get(connection)
            .map(|membership| membership.participant.clone())
    }

    /// Current members of `room`, in join order. Empty if the room does not exist.
    pub async fn members(&self, room: &RoomId) -> Vec<Member> {
        let Some(tx) = self.rooms.get(room).map(|handle| handle.tx.clone()) else {
            return Vec::new();
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        if tx.send(RoomCommand::Members { reply: reply_tx }).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn room_handle(&self, room: &RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.get(room) {
            return handle.clone();
        }

        self.rooms
            .entry(room.clone())
            .or_insert_with(|| self.spawn_room(room))
            .clone()
    }

    fn spawn_room(&self, room: &RoomId) -> RoomHandle {
        info!("Creating new room: {}", room);
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.command_capacity);

        let actor = Room::new(
            room.clone(),
            epoch,
            rx,
            self.signaling.clone(),
            self.rooms.clone(),
        );
        tokio::spawn(actor.run());

        RoomHandle { epoch, tx }
    }
}
