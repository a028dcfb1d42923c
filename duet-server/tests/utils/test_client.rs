use anyhow::{Context, Result};
use duet_core::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// WebSocket client speaking the signaling protocol, for driving a real server.
pub struct TestClient {
    pub name: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and consume the `ice:config` greeting.
    pub async fn connect(addr: SocketAddr, name: &str) -> Result<Self> {
        let url = format!("ws://{}/ws", addr);
        let (stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let mut client = Self {
            name: name.to_string(),
            stream,
        };
        client
            .expect("ice:config", super::SIGNAL_TIMEOUT_MS)
            .await
            .context("No ICE config on connect")?;
        Ok(client)
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        self.send_raw(&json).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        tracing::debug!("[TestClient {}] -> {}", self.name, text);
        self.stream
            .send(Message::text(text))
            .await
            .context("Failed to send frame")
    }

    /// Next server event, or an error on timeout or close.
    pub async fn recv(&mut self, timeout_ms: u64) -> Result<ServerEvent> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = tokio::time::timeout(remaining, self.stream.next())
                .await
                .with_context(|| format!("[{}] Timeout waiting for event", self.name))?;

            match frame {
                Some(Ok(Message::Text(text))) => {
                    let event = serde_json::from_str::<ServerEvent>(text.as_str())
                        .context("Failed to parse server event")?;
                    tracing::debug!("[TestClient {}] <- {}", self.name, event.kind());
                    return Ok(event);
                }
                Some(Ok(Message::Close(_))) | None => anyhow::bail!("Socket closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Skip events until one of `kind` arrives.
    pub async fn expect(&mut self, kind: &str, timeout_ms: u64) -> Result<ServerEvent> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.recv(remaining.as_millis() as u64).await?;
            if event.kind() == kind {
                return Ok(event);
            }
            tracing::debug!("[TestClient {}] skipping {}", self.name, event.kind());
        }
    }

    /// True if no event arrives within `timeout_ms`.
    pub async fn is_quiet(&mut self, timeout_ms: u64) -> bool {
        self.recv(timeout_ms).await.is_err()
    }

    /// Join `room` and wait for the confirmation.
    pub async fn join(&mut self, room: &str) -> Result<()> {
        let event = ClientEvent::RoomJoin {
            email: self.name.as_str().into(),
            room: room.into(),
        };
        self.send(&event).await?;
        self.expect("room:joined", super::SIGNAL_TIMEOUT_MS).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await.context("Failed to close socket")
    }
}
