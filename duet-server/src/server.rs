use crate::config::ServerConfig;
use crate::relay::RelayDispatcher;
use crate::room::RoomManager;
use crate::signaling::{SignalingOutput, SignalingService, ws_handler};
use anyhow::Context;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Everything the WebSocket handlers share.
#[derive(Clone)]
pub struct ServerState {
    pub signaling: SignalingService,
    pub rooms: RoomManager,
    pub relay: RelayDispatcher,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        let signaling = SignalingService::new(config.ice_servers.clone());
        let output: Arc<dyn SignalingOutput> = Arc::new(signaling.clone());

        Self {
            rooms: RoomManager::with_capacity(output.clone(), config.room_command_capacity),
            relay: RelayDispatcher::new(output),
            signaling,
        }
    }
}

pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    serve_on(listener, config).await
}

/// Serve on an already bound listener. Tests bind port 0 and read the address back.
pub async fn serve_on(listener: TcpListener, config: ServerConfig) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    let app = router(ServerState::new(&config));

    info!("Signaling server listening on ws://{}/ws", addr);
    axum::serve(listener, app).await.context("signaling server failed")
}
