use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use duet_core::{ConnectionId, IceServerConfig, ServerEvent, SignalingError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, trace};

struct SignalingInner {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Live websocket connections, keyed by the id assigned at upgrade time.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_connection(&self, id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.connections.insert(id, tx);
    }

    pub fn remove_connection(&self, id: &ConnectionId) {
        self.inner.connections.remove(id);
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.inner.connections.contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn send_event(&self, to: &ConnectionId, event: &ServerEvent) -> Result<(), SignalingError> {
        let json = serde_json::to_string(event).map_err(|e| {
            error!("Failed to serialize {} event: {}", event.kind(), e);
            SignalingError::Protocol(e.to_string())
        })?;

        // Clone the sender out so no shard lock is held while sending.
        let tx = self
            .inner
            .connections
            .get(to)
            .map(|entry| entry.value().clone())
            .ok_or(SignalingError::PeerUnreachable(*to))?;

        trace!("-> {} {}", to, event.kind());
        tx.send(Message::Text(json.into()))
            .map_err(|_| SignalingError::PeerUnreachable(*to))
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send(&self, to: &ConnectionId, event: ServerEvent) -> Result<(), SignalingError> {
        self.send_event(to, &event)
    }
}
