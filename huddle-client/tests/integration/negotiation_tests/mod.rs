mod test_offer_answer;
mod test_rejections;

use crate::utils::{FakeMediaSession, MockSignalingOutput, fake_sdp};
use huddle_client::media::{LinkId, LocalTrack, MediaSession, TransportEvent, TransportEvents};
use huddle_client::negotiator::Negotiator;
use huddle_client::NegotiationTarget;
use huddle_core::{IceCandidate, ParticipantId, RoomKey, StreamId, TrackKind};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One negotiator for "alice" wired to a fake session and a recording channel.
pub struct Harness {
    pub negotiator: Negotiator,
    pub session: Arc<FakeMediaSession>,
    pub signaling: MockSignalingOutput,
    pub transport_rx: mpsc::Receiver<TransportEvent>,
}

impl Harness {
    pub async fn new(target: NegotiationTarget) -> Self {
        Self::build(target, FakeMediaSession::new).await
    }

    async fn build(
        target: NegotiationTarget,
        make_session: impl FnOnce(TransportEvents) -> FakeMediaSession,
    ) -> Self {
        let (tx, transport_rx) = mpsc::channel(64);
        let events = TransportEvents::new(target.clone(), LinkId(1), tx);
        let session = Arc::new(make_session(events));

        let stream = StreamId::new("alice-cam");
        session
            .attach_local_tracks(&[
                LocalTrack::new(TrackKind::Audio, stream.clone()),
                LocalTrack::new(TrackKind::Video, stream),
            ])
            .await
            .expect("Failed to attach tracks");

        let signaling = MockSignalingOutput::new_stored_only();
        let negotiator = Negotiator::new(
            target,
            ParticipantId::from("alice"),
            RoomKey::from("main"),
            session.clone(),
            Arc::new(signaling.clone()),
        );

        Self {
            negotiator,
            session,
            signaling,
            transport_rx,
        }
    }

    pub async fn with_peer(peer: &str) -> Self {
        Self::new(NegotiationTarget::Peer(ParticipantId::from(peer))).await
    }

    /// Like [`Harness::with_peer`], but the session refuses remote descriptions.
    pub async fn failing_peer(peer: &str) -> Self {
        Self::build(
            NegotiationTarget::Peer(ParticipantId::from(peer)),
            FakeMediaSession::failing,
        )
        .await
    }

    /// Transport events produced so far.
    pub fn transport_events(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.transport_rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// What bob's side publishes: one stream with audio and video.
pub fn bob_sdp() -> String {
    fake_sdp(&[
        ("bob-cam", "bob-audio", TrackKind::Audio),
        ("bob-cam", "bob-video", TrackKind::Video),
    ])
}

pub fn candidate(port: u16) -> IceCandidate {
    IceCandidate::new(
        format!("candidate:{port} 1 udp 2122260223 192.168.1.20 {port} typ host"),
        Some("0".to_owned()),
        Some(0),
    )
}
