use crate::server::ServerState;
use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{Message, WebSocket};
use axum::response::IntoResponse;
use duet_core::{ClientEvent, ConnectionId, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let connection = ConnectionId::new();
    info!("New WebSocket connection: {}", connection);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.signaling.add_connection(connection, tx);

    let ice_config = ServerEvent::IceConfig {
        ice_servers: state.signaling.ice_servers(),
    };
    if let Err(e) = state.signaling.send_event(&connection, &ice_config) {
        warn!("Failed to send ICE config to {}: {}", connection, e);
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => handle_event(&state, connection, event).await,
                        Err(e) => {
                            warn!("Invalid ClientEvent from {}: {}", connection, e);
                            let reply = ServerEvent::Error {
                                message: format!("invalid message: {}", e),
                            };
                            let _ = state.signaling.send_event(&connection, &reply);
                        }
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Drop the route before user:left goes out; later relays to this id bounce.
    let participant = state.rooms.participant_of(&connection);
    state.signaling.remove_connection(&connection);

    // A dropped socket is handled exactly like room:leave.
    if let Some(left) = state.rooms.leave(&connection).await {
        debug!("{} left '{}' on disconnect", left.member.participant, left.room);
    } else if let Some(participant) = participant {
        debug!("{} disconnected outside any room", participant);
    }
    info!("WebSocket disconnected: {}", connection);
}

async fn handle_event(state: &ServerState, connection: ConnectionId, event: ClientEvent) {
    let event = match event.into_relayed(connection) {
        Ok(relayed) => {
            let _ = state.relay.dispatch(connection, relayed).await;
            return;
        }
        Err(event) => event,
    };

    match event {
        ClientEvent::RoomJoin { email, room } => {
            info!("{} ({}) wants to join room '{}'", connection, email, room);
            if let Err(e) = state.rooms.join(connection, email, room).await {
                let reply = ServerEvent::Error {
                    message: e.to_string(),
                };
                let _ = state.signaling.send_event(&connection, &reply);
            }
        }
        ClientEvent::RoomLeave => {
            if state.rooms.leave(&connection).await.is_none() {
                debug!("{} sent room:leave outside any room", connection);
            }
        }
        other => warn!("Unhandled {} from {}", other.kind(), connection),
    }
}
