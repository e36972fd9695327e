use super::MockRoom;
use crate::integration::{collect_until, eventually, init_tracing};
use crate::utils::{FakeMediaFactory, fake_sdp};
use huddle_client::{NegotiationTarget, RoomEvent, Topology};
use huddle_core::{Signal, TrackKind};
use serde_json::json;

fn server_sdp() -> String {
    fake_sdp(&[
        ("mixer", "mixer-audio", TrackKind::Audio),
        ("mixer", "mixer-video", TrackKind::Video),
    ])
}

/// Parses the text exactly as a media server writes it: bare payload, no
/// participant fields.
fn from_server(event: &str, data: serde_json::Value) -> Signal {
    let text = json!({ "event": event, "data": data }).to_string();
    let signal = Signal::decode(&text).expect("server envelope rejected");
    assert!(signal.is_from_server());
    signal
}

#[tokio::test]
async fn test_bare_server_answer_completes_negotiation() {
    init_tracing();
    let mut room = MockRoom::join(Topology::Sfu, FakeMediaFactory::new()).await;

    room.session.initiate(NegotiationTarget::Sfu).await.unwrap();
    room.deliver(from_server("answer", json!({ "type": "answer", "sdp": server_sdp() })));

    collect_until(&mut room.events, |seen| {
        seen.iter()
            .any(|e| matches!(e, RoomEvent::Negotiated { target } if *target == NegotiationTarget::Sfu))
            && seen.iter().any(|e| matches!(e, RoomEvent::StreamAdded { .. }))
    })
    .await;

    room.deliver(from_server(
        "candidate",
        json!({
            "candidate": "candidate:2 1 udp 2130706431 10.0.0.2 5000 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0,
            "usernameFragment": null,
        }),
    ));

    let sfu = room.media.session(&NegotiationTarget::Sfu).unwrap();
    assert!(eventually(|| sfu.remote_candidates().len() == 1).await);
    assert_eq!(room.media.created(), 1);

    room.session.leave().await;
}

#[tokio::test]
async fn test_bare_server_offer_is_answered() {
    init_tracing();
    let mut room = MockRoom::join(Topology::Sfu, FakeMediaFactory::new()).await;

    room.deliver(from_server("offer", json!({ "type": "offer", "sdp": server_sdp() })));
    assert!(room.signaling.wait_for_sent("answer", 1).await);

    let sent = room.signaling.sent().await;
    let answer = sent
        .iter()
        .find_map(|s| match s {
            Signal::Answer(p) => Some(p),
            _ => None,
        })
        .unwrap();
    assert_eq!(answer.target_id, None);
    assert_eq!(answer.self_id.as_str(), "alice");

    collect_until(&mut room.events, |seen| {
        seen.iter().any(|e| matches!(e, RoomEvent::Negotiated { .. }))
    })
    .await;

    room.session.leave().await;
}
