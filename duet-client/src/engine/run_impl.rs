use crate::engine::NegotiationEngine;
use duet_core::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;
use tracing::info;

/// Requests from the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    CallUser,
    SendStreams(ConnectionId),
    Leave,
    Shutdown,
}

impl NegotiationEngine {
    /// Drive the engine until the signaling channel closes or a shutdown is requested.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<ServerEvent>,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    ) {
        info!("Negotiation engine started");

        loop {
            tokio::select! {
                event = inbound.recv() => match event {
                    Some(event) => {
                        let _ = self.handle_signal(event).await;
                    }
                    None => {
                        info!("Signaling channel closed");
                        break;
                    }
                },

                command = commands.recv() => match command {
                    Some(EngineCommand::CallUser) => {
                        let _ = self.call_user().await;
                    }
                    Some(EngineCommand::SendStreams(peer)) => {
                        let _ = self.send_streams(peer).await;
                    }
                    Some(EngineCommand::Leave) => {
                        let _ = self.leave().await;
                    }
                    Some(EngineCommand::Shutdown) | None => break,
                },

                Some(notification) = self.transport_rx.recv() => {
                    let _ = self.handle_transport_event(notification).await;
                }
            }
        }

        self.close_all().await;
        info!("Negotiation engine stopped");
    }
}
