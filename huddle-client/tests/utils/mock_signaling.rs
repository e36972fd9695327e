use async_trait::async_trait;
use huddle_client::ChannelError;
use huddle_client::signaling::{ChannelEvent, SignalingConnector, SignalingOutput};
use huddle_core::Signal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingOutput that captures all outgoing envelopes.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured envelopes.
    tx: mpsc::UnboundedSender<Signal>,
    /// All captured envelopes (for verification).
    signals: Arc<Mutex<Vec<Signal>>>,
    closed: Arc<AtomicBool>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            signals: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };
        (signaling, rx)
    }

    /// Create a MockSignalingOutput without a receiver (envelopes are only stored).
    pub fn new_stored_only() -> Self {
        let (signaling, _rx) = Self::new();
        signaling
    }

    pub async fn sent(&self) -> Vec<Signal> {
        self.signals.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.signals.lock().await.len()
    }

    /// Tags of every envelope sent so far, in order.
    pub async fn events(&self) -> Vec<String> {
        self.signals
            .lock()
            .await
            .iter()
            .map(|s| s.event().to_owned())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits until `count` envelopes tagged `event` were sent.
    pub async fn wait_for_sent(&self, event: &str, count: usize) -> bool {
        for _ in 0..150 {
            let sent = self.events().await.iter().filter(|e| *e == event).count();
            if sent >= count {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        false
    }
}

impl Default for MockSignalingOutput {
    fn default() -> Self {
        Self::new_stored_only()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send(&self, signal: Signal) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        tracing::debug!("[MockSignaling] send {}", signal.event());

        self.signals.lock().await.push(signal.clone());
        let _ = self.tx.send(signal);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out one [`MockSignalingOutput`] and lets the test play the server.
pub struct MockConnector {
    output: MockSignalingOutput,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<ChannelEvent>>>,
    connects: AtomicUsize,
}

impl MockConnector {
    /// Returns the connector, the output it will hand out, and the sender
    /// through which the test injects inbound events.
    pub fn new() -> (
        Arc<Self>,
        MockSignalingOutput,
        mpsc::UnboundedSender<ChannelEvent>,
    ) {
        let output = MockSignalingOutput::new_stored_only();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            output: output.clone(),
            inbound: Mutex::new(Some(inbound_rx)),
            connects: AtomicUsize::new(0),
        });
        (connector, output, inbound_tx)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalingConnector for MockConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn SignalingOutput>, mpsc::UnboundedReceiver<ChannelEvent>), ChannelError> {
        tracing::debug!("[MockSignaling] connect {}", url);
        self.connects.fetch_add(1, Ordering::SeqCst);

        let Some(inbound) = self.inbound.lock().await.take() else {
            return Err(ChannelError::Closed);
        };
        Ok((Arc::new(self.output.clone()), inbound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::{ParticipantId, Presence, RoomKey};

    #[tokio::test]
    async fn test_mock_signaling_captures_envelopes() {
        let (signaling, mut rx) = MockSignalingOutput::new();
        let join = Signal::Join(Presence {
            self_id: ParticipantId::from("alice"),
            room_id: RoomKey::from("main"),
        });

        signaling.send(join.clone()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), join);
        assert_eq!(signaling.events().await, vec!["joinRoom".to_owned()]);
    }

    #[tokio::test]
    async fn test_mock_signaling_rejects_after_close() {
        let signaling = MockSignalingOutput::new_stored_only();
        signaling.close().await;

        let err = signaling
            .send(Signal::Unknown {
                event: "x".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }
}
