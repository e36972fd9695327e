use futures::{SinkExt, StreamExt};
use huddle_core::{ParticipantId, Presence, RoomKey, Signal};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Timeout for a single expected envelope (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 3000;

/// Window in which no envelope is expected (ms).
pub const QUIET_MS: u64 = 300;

/// Raw WebSocket client speaking the envelope protocol.
pub struct WsClient {
    pub id: ParticipantId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(addr: SocketAddr, id: &str) -> Self {
        let (stream, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("Failed to connect to relay");
        Self {
            id: ParticipantId::from(id),
            stream,
        }
    }

    pub async fn send(&mut self, signal: &Signal) {
        let text = signal.encode().expect("Failed to encode");
        self.send_raw(&text).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_owned().into()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn join(&mut self, room: &str) {
        let join = Signal::Join(Presence {
            self_id: self.id.clone(),
            room_id: RoomKey::from(room),
        });
        self.send(&join).await;
    }

    /// Next decoded envelope, or `None` on timeout or close.
    pub async fn recv_within(&mut self, timeout_ms: u64) -> Option<Signal> {
        let deadline = Duration::from_millis(timeout_ms);
        loop {
            let frame = tokio::time::timeout(deadline, self.stream.next()).await.ok()??;
            match frame {
                Ok(Message::Text(text)) => return Some(Signal::decode(&text).expect("Bad envelope")),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    pub async fn recv(&mut self) -> Signal {
        self.recv_within(SIGNAL_TIMEOUT_MS)
            .await
            .expect("Timeout waiting for envelope")
    }

    pub async fn expect_quiet(&mut self) {
        if let Some(signal) = self.recv_within(QUIET_MS).await {
            panic!("Unexpected envelope: {signal:?}");
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// Polls `check` until it holds or the timeout expires.
pub async fn eventually(timeout_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
