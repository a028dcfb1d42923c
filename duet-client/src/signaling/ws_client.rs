use crate::signaling::SignalSender;
use anyhow::{Context, Result};
use duet_core::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Signaling WebSocket split into an outbound [`SignalSender`] and an inbound event stream.
pub struct WsSignalClient {
    pub sender: SignalSender,
    pub events: mpsc::UnboundedReceiver<ServerEvent>,
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
}

impl WsSignalClient {
    /// Connect to `url` (e.g. `ws://127.0.0.1:8000/ws`).
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to {}", url))?;
        info!("Connected to signaling server {}", url);

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerEvent>();

        let send_task = tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", event.kind(), e);
                        continue;
                    }
                };
                debug!("-> {}", event.kind());
                if sink.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = source.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            debug!("<- {}", event.kind());
                            if in_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid ServerEvent: {}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            info!("Signaling connection closed");
        });

        Ok(Self {
            sender: SignalSender::new(out_tx),
            events: in_rx,
            send_task,
            recv_task,
        })
    }

    /// Split off the parts the engine needs. Dropping the returned guard closes the socket.
    pub fn into_parts(self) -> (SignalSender, mpsc::UnboundedReceiver<ServerEvent>, SocketGuard) {
        (
            self.sender,
            self.events,
            SocketGuard {
                send_task: self.send_task,
                recv_task: self.recv_task,
            },
        )
    }
}

/// Aborts the socket tasks on drop.
pub struct SocketGuard {
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        self.send_task.abort();
        self.recv_task.abort();
    }
}
