use super::{Harness, bob_sdp};
use crate::integration::init_tracing;
use huddle_client::NegotiationState;
use huddle_client::media::TransportEvent;
use huddle_core::{ParticipantId, SdpKind, SessionDescription, Signal};

#[tokio::test]
async fn test_initiator_reaches_stable() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    h.negotiator.initiate().await.expect("initiate failed");
    assert_eq!(h.negotiator.state(), NegotiationState::OfferSent);

    let sent = h.signaling.sent().await;
    assert_eq!(sent.len(), 1);
    let Signal::Offer(offer) = &sent[0] else {
        panic!("Expected an offer, got {:?}", sent[0]);
    };
    assert_eq!(offer.self_id, ParticipantId::from("alice"));
    assert_eq!(offer.target_id, Some(ParticipantId::from("bob")));
    assert_eq!(offer.offer.kind, SdpKind::Offer);
    assert!(offer.offer.sdp.contains("alice-cam"));

    h.negotiator
        .on_remote_answer(SessionDescription::answer(bob_sdp()))
        .await
        .expect("answer rejected");
    assert_eq!(h.negotiator.state(), NegotiationState::Stable);

    let events = h.transport_events();
    let candidates = events
        .iter()
        .filter(|e| matches!(e, TransportEvent::LocalCandidate { .. }))
        .count();
    let tracks = events
        .iter()
        .filter(|e| matches!(e, TransportEvent::RemoteTrack { .. }))
        .count();
    assert_eq!(candidates, 1);
    assert_eq!(tracks, 2);
}

#[tokio::test]
async fn test_answerer_reaches_stable() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    h.negotiator
        .on_remote_offer(SessionDescription::offer(bob_sdp()))
        .await
        .expect("offer rejected");
    assert_eq!(h.negotiator.state(), NegotiationState::Stable);

    let sent = h.signaling.sent().await;
    assert_eq!(sent.len(), 1);
    let Signal::Answer(answer) = &sent[0] else {
        panic!("Expected an answer, got {:?}", sent[0]);
    };
    assert_eq!(answer.target_id, Some(ParticipantId::from("bob")));
    assert_eq!(answer.answer.kind, SdpKind::Answer);

    let calls = h.session.calls();
    let applied = calls.iter().position(|c| c == "apply_remote_description");
    let answered = calls.iter().position(|c| c == "create_answer");
    assert!(applied.is_some() && applied < answered);

    let tracks = h
        .transport_events()
        .into_iter()
        .filter(|e| matches!(e, TransportEvent::RemoteTrack { .. }))
        .count();
    assert_eq!(tracks, 2);
}

#[tokio::test]
async fn test_sfu_envelopes_are_untargeted() {
    init_tracing();
    let mut h = Harness::new(huddle_client::NegotiationTarget::Sfu).await;

    h.negotiator.initiate().await.expect("initiate failed");
    h.negotiator
        .on_local_candidate(super::candidate(50000))
        .await
        .expect("candidate not sent");

    let sent = h.signaling.sent().await;
    assert!(matches!(&sent[0], Signal::Offer(p) if p.target_id.is_none()));
    assert!(matches!(&sent[1], Signal::Candidate(p) if p.target_id.is_none()));
}

#[tokio::test]
async fn test_renegotiation_after_stable() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    h.negotiator.initiate().await.unwrap();
    h.negotiator
        .on_remote_answer(SessionDescription::answer(bob_sdp()))
        .await
        .unwrap();

    // A second exchange reuses the same link.
    h.negotiator.initiate().await.expect("renegotiation refused");
    assert_eq!(h.negotiator.state(), NegotiationState::OfferSent);
    assert_eq!(h.session.call_count("create_offer"), 2);
}
