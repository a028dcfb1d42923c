use crate::media::{
    BoundMedia, MediaAttachment, MediaConstraints, MediaHandle, MediaSink, MediaSource,
    RemoteMedia, Surface,
};
use crate::signaling::SignalChannel;
use crate::transport::{
    ConnectionState, TransportConfig, TransportEventSink, TransportFactory, TransportNotification,
};
use duet_core::{ClientEvent, ConnectionId, ParticipantId, RoomId, SignalingError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

mod call_user_impl;
mod handle_signal_impl;
mod incoming_call_impl;
mod renegotiation_impl;
mod run_impl;
mod send_streams_impl;
mod session;
mod transport_event_impl;

pub use run_impl::EngineCommand;
pub use session::{NegotiationSession, NegotiationState};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub constraints: MediaConstraints,
    /// Call the counterpart as soon as it is announced.
    pub auto_call: bool,
    pub transport: TransportConfig,
}

/// The other participant, as far as this side knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterpart {
    pub id: ConnectionId,
    /// Known only on the side that received `user:joined`.
    pub email: Option<ParticipantId>,
}

/// What the engine reports to the front-end.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Joined(RoomId),
    PeerJoined {
        peer: ConnectionId,
        email: ParticipantId,
    },
    PeerLeft {
        peer: ConnectionId,
        email: ParticipantId,
    },
    StateChanged {
        peer: ConnectionId,
        state: NegotiationState,
    },
    LocalMedia(MediaHandle),
    RemoteMedia {
        peer: ConnectionId,
        media: RemoteMedia,
    },
    TransportState {
        peer: ConnectionId,
        state: ConnectionState,
    },
    SessionClosed(ConnectionId),
    MediaUnavailable(String),
    SessionError {
        peer: ConnectionId,
        error: SignalingError,
    },
    CallFailed {
        peer: ConnectionId,
        reason: String,
    },
    ServerError(String),
}

/// Client-side negotiation state machine.
///
/// Owns one [`NegotiationSession`] per counterpart and is driven by exactly one task, so every
/// transition runs to completion before the next input is looked at.
pub struct NegotiationEngine {
    config: EngineConfig,
    signal: Arc<dyn SignalChannel>,
    media: Arc<dyn MediaSource>,
    transports: Arc<dyn TransportFactory>,
    sessions: HashMap<ConnectionId, NegotiationSession>,
    counterpart: Option<Counterpart>,
    attachment: Option<MediaAttachment>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    transport_tx: mpsc::UnboundedSender<TransportNotification>,
    transport_rx: mpsc::UnboundedReceiver<TransportNotification>,
    next_epoch: u64,
}

impl NegotiationEngine {
    pub fn new(
        config: EngineConfig,
        signal: Arc<dyn SignalChannel>,
        media: Arc<dyn MediaSource>,
        transports: Arc<dyn TransportFactory>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();

        let engine = Self {
            config,
            signal,
            media,
            transports,
            sessions: HashMap::new(),
            counterpart: None,
            attachment: None,
            events_tx,
            transport_tx,
            transport_rx,
            next_epoch: 0,
        };
        (engine, events_rx)
    }

    /// Render local and remote media through `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn MediaSink>) -> Self {
        self.attachment = Some(MediaAttachment::new(sink));
        self
    }

    pub fn counterpart(&self) -> Option<&Counterpart> {
        self.counterpart.as_ref()
    }

    pub fn session(&self, peer: &ConnectionId) -> Option<&NegotiationSession> {
        self.sessions.get(peer)
    }

    pub fn state_of(&self, peer: &ConnectionId) -> Option<NegotiationState> {
        self.sessions.get(peer).map(|s| s.state())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Leave the room: every session is torn down and the server is told.
    pub async fn leave(&mut self) -> Result<(), SignalingError> {
        self.close_all().await;
        self.counterpart = None;
        self.signal.emit(ClientEvent::RoomLeave).await
    }

    async fn close_all(&mut self) {
        let peers: Vec<ConnectionId> = self.sessions.keys().copied().collect();
        for peer in peers {
            self.discard_session(&peer).await;
        }
    }

    async fn acquire_media(&mut self) -> Result<MediaHandle, SignalingError> {
        match self.media.acquire(self.config.constraints).await {
            Ok(handle) => {
                self.bind(Surface::Local, BoundMedia::Local(handle.clone()));
                self.emit_event(EngineEvent::LocalMedia(handle.clone()));
                Ok(handle)
            }
            Err(e) => {
                warn!("Local media unavailable: {}", e);
                let reason = match &e {
                    SignalingError::MediaUnavailable(reason) => reason.clone(),
                    other => other.to_string(),
                };
                self.emit_event(EngineEvent::MediaUnavailable(reason));
                Err(e)
            }
        }
    }

    async fn open_session(
        &mut self,
        peer: ConnectionId,
        local: MediaHandle,
        initiator: bool,
    ) -> Result<NegotiationSession, SignalingError> {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let sink = TransportEventSink::new(peer, epoch, self.transport_tx.clone());
        let transport = self.transports.open(&self.config.transport, sink).await?;

        debug!("Opened transport to {} (epoch {})", peer, epoch);
        Ok(NegotiationSession::new(peer, epoch, transport, local, initiator))
    }

    /// Drop the session for `peer`, close its transport and clear its surface.
    async fn discard_session(&mut self, peer: &ConnectionId) -> bool {
        let Some(session) = self.sessions.remove(peer) else {
            return false;
        };

        info!("Discarding session with {} ({})", peer, session.state());
        session.close().await;
        if let Some(attachment) = self.attachment.as_mut() {
            attachment.detach(&Surface::Remote(*peer));
        }
        self.emit_event(EngineEvent::SessionClosed(*peer));
        true
    }

    fn set_state(&mut self, peer: &ConnectionId, state: NegotiationState) {
        if let Some(session) = self.sessions.get_mut(peer) {
            if session.state() != state {
                debug!("{}: {} -> {}", peer, session.state(), state);
                session.state = state;
                self.emit_event(EngineEvent::StateChanged { peer: *peer, state });
            }
        }
    }

    fn bind(&mut self, surface: Surface, media: BoundMedia) {
        if let Some(attachment) = self.attachment.as_mut() {
            attachment.bind(surface, &media);
        }
    }

    fn emit_event(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Log and surface a per-session failure. The engine keeps going.
    fn report(&self, peer: ConnectionId, result: &Result<(), SignalingError>) {
        if let Err(error) = result {
            warn!("Session with {}: {}", peer, error);
            self.emit_event(EngineEvent::SessionError {
                peer,
                error: error.clone(),
            });
        }
    }

    /// Error for an event the session (or its absence) cannot accept.
    fn unexpected(&self, peer: &ConnectionId, operation: &str) -> SignalingError {
        let state = self
            .sessions
            .get(peer)
            .map(|s| s.state())
            .unwrap_or(NegotiationState::Idle);
        SignalingError::invalid_state(state, operation)
    }
}
