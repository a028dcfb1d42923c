use crate::signaling::SignalChannel;
use duet_core::{ClientEvent, ParticipantId, RoomId, SignalingError};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Lobby,
    Joining(RoomId),
    Room(RoomId),
}

/// Turns the join form into a `room:join` request and the confirmation into the room view.
pub struct LobbyBridge {
    signal: Arc<dyn SignalChannel>,
    view: View,
}

impl LobbyBridge {
    pub fn new(signal: Arc<dyn SignalChannel>) -> Self {
        Self {
            signal,
            view: View::Lobby,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub async fn submit(&mut self, email: &str, room: &str) -> Result<(), SignalingError> {
        let (email, room) = (email.trim(), room.trim());
        if email.is_empty() {
            return Err(SignalingError::Protocol("email is required".to_string()));
        }
        if room.is_empty() {
            return Err(SignalingError::Protocol("room is required".to_string()));
        }

        let room = RoomId::from(room);
        self.signal
            .emit(ClientEvent::RoomJoin {
                email: ParticipantId::from(email),
                room: room.clone(),
            })
            .await?;
        self.view = View::Joining(room);
        Ok(())
    }

    /// Returns true if this confirmation moved the view into the room.
    pub fn on_room_joined(&mut self, room: &RoomId) -> bool {
        match &self.view {
            View::Joining(requested) if requested == room => {
                info!("Entering room '{}'", room);
                self.view = View::Room(room.clone());
                true
            }
            other => {
                debug!("Ignoring confirmation for '{}' while in {:?}", room, other);
                false
            }
        }
    }

    pub async fn leave(&mut self) -> Result<(), SignalingError> {
        if self.view == View::Lobby {
            return Ok(());
        }
        self.signal.emit(ClientEvent::RoomLeave).await?;
        self.view = View::Lobby;
        Ok(())
    }
}
