use crate::error::ChannelError;
use crate::signaling::{ChannelEvent, SignalingConnector, SignalingOutput};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::Signal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// WebSocket signaling connection carrying JSON envelopes.
///
/// A writer task drains queued envelopes into the socket; a reader task
/// decodes inbound text frames into [`ChannelEvent`]s. There is no automatic
/// reconnect.
pub struct SignalingChannel {
    outgoing: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl SignalingChannel {
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ChannelEvent>), ChannelError> {
        let parsed = Url::parse(url).map_err(|e| ChannelError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ChannelError::InvalidUrl {
                url: url.to_owned(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let (ws_stream, _) = connect_async(parsed.as_str())
            .await
            .map_err(|e| ChannelError::Connect {
                url: url.to_owned(),
                source: Box::new(e),
            })?;
        info!("Connected to signaling server: {}", url);

        let (mut sink, mut stream) = ws_stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                loop {
                    tokio::select! {
                        msg = outgoing_rx.recv() => {
                            let Some(msg) = msg else { break };
                            if let Err(e) = sink.send(msg).await {
                                warn!("Signaling write failed: {}", e);
                                shutdown.cancel();
                                break;
                            }
                        }
                        _ = shutdown.cancelled() => {
                            // Flush what was queued before the close.
                            while let Ok(msg) = outgoing_rx.try_recv() {
                                if sink.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
                debug!("Signaling writer stopped");
            }
        });

        tokio::spawn({
            let shutdown = shutdown.clone();
            let closed = closed.clone();
            async move {
                let reason = loop {
                    let frame = tokio::select! {
                        frame = stream.next() => frame,
                        _ = shutdown.cancelled() => break None,
                    };

                    match frame {
                        Some(Ok(Message::Text(text))) => match Signal::decode(&text) {
                            Ok(signal) => {
                                if events_tx.send(ChannelEvent::Message(signal)).is_err() {
                                    break None;
                                }
                            }
                            Err(e) => warn!("Dropping malformed envelope: {}", e),
                        },
                        Some(Ok(Message::Close(_))) | None => break None,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break Some(ChannelError::Transport(e.to_string())),
                    }
                };

                closed.store(true, Ordering::Release);
                shutdown.cancel();
                info!("Signaling channel closed");
                let _ = events_tx.send(ChannelEvent::Closed(reason));
            }
        });

        let channel = Self {
            outgoing,
            closed,
            shutdown,
        };
        Ok((channel, events_rx))
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.shutdown.is_cancelled()
    }
}

#[async_trait]
impl SignalingOutput for SignalingChannel {
    async fn send(&self, signal: Signal) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }

        let text = signal.encode()?;
        debug!("-> {}", signal.event());
        self.outgoing
            .send(Message::Text(text.into()))
            .map_err(|_| ChannelError::Closed)
    }

    async fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Opens [`SignalingChannel`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn SignalingOutput>, mpsc::UnboundedReceiver<ChannelEvent>), ChannelError> {
        let (channel, events) = SignalingChannel::connect(url).await?;
        Ok((Arc::new(channel), events))
    }
}
