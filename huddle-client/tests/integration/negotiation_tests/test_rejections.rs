use super::{Harness, bob_sdp};
use crate::integration::init_tracing;
use huddle_client::{NegotiationError, NegotiationState, ProtocolError, SessionError};
use huddle_client::media::MediaSession;
use huddle_core::{IceCandidate, SdpKind, SessionDescription};

#[tokio::test]
async fn test_answer_without_offer_is_rejected() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    let err = h
        .negotiator
        .on_remote_answer(SessionDescription::answer(bob_sdp()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::UnexpectedAnswer {
            state: NegotiationState::Idle
        })
    ));
    assert!(!err.is_fatal_for_link());
    assert_eq!(h.negotiator.state(), NegotiationState::Idle);
    assert_eq!(h.session.call_count("apply_remote_description"), 0);
    assert_eq!(h.signaling.sent_count().await, 0);
}

#[tokio::test]
async fn test_answer_while_answering_is_rejected() {
    init_tracing();
    let mut h = Harness::failing_peer("bob").await;

    let err = h
        .negotiator
        .on_remote_offer(SessionDescription::offer(bob_sdp()))
        .await
        .unwrap_err();
    assert!(err.is_fatal_for_link());
    assert_eq!(h.negotiator.state(), NegotiationState::OfferReceived);

    let err = h
        .negotiator
        .on_remote_answer(SessionDescription::answer(bob_sdp()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::UnexpectedAnswer {
            state: NegotiationState::OfferReceived
        })
    ));
    assert!(!err.is_fatal_for_link());
    assert_eq!(h.negotiator.state(), NegotiationState::OfferReceived);
    assert_eq!(h.session.call_count("apply_remote_description"), 1);
    assert_eq!(h.signaling.sent_count().await, 0);
}

#[tokio::test]
async fn test_malformed_candidate_is_rejected() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    let garbage = IceCandidate::new("not a candidate", Some("0".to_owned()), Some(0));
    let err = h.negotiator.on_remote_candidate(garbage).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidCandidate(_)));

    let unplaced = IceCandidate::new(
        "candidate:1 1 udp 2130706431 10.0.0.1 9 typ host",
        None,
        None,
    );
    let err = h.negotiator.on_remote_candidate(unplaced).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidCandidate(_)));

    assert_eq!(h.negotiator.deferred_candidates(), 0);
    assert_eq!(h.negotiator.state(), NegotiationState::Idle);
}

#[tokio::test]
async fn test_second_offer_while_pending_is_refused() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    h.negotiator.initiate().await.unwrap();
    let err = h.negotiator.initiate().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::OfferInFlight {
            state: NegotiationState::OfferSent
        })
    ));
    assert_eq!(h.session.call_count("create_offer"), 1);
    assert_eq!(h.signaling.sent_count().await, 1);
}

#[tokio::test]
async fn test_answer_sdp_in_offer_envelope_is_rejected() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    let err = h
        .negotiator
        .on_remote_offer(SessionDescription::answer(bob_sdp()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::WrongDescription {
            expected: SdpKind::Offer,
            got: SdpKind::Answer
        })
    ));
    assert_eq!(h.negotiator.state(), NegotiationState::Idle);
}

#[tokio::test]
async fn test_closed_session_fails_the_link() {
    init_tracing();
    let mut h = Harness::with_peer("bob").await;

    h.session.close().await;
    let err = h.negotiator.initiate().await.unwrap_err();

    assert!(matches!(err, SessionError::Negotiation(NegotiationError::Closed)));
    assert!(err.is_fatal_for_link());
    assert!(!err.is_fatal_for_room());
    assert_eq!(h.negotiator.state(), NegotiationState::Idle);
}
