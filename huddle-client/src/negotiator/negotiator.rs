use crate::error::{InvalidCandidate, ProtocolError, SessionError};
use crate::media::MediaSession;
use crate::negotiator::{NegotiationState, NegotiationTarget};
use crate::signaling::SignalingOutput;
use huddle_core::{
    AnswerPayload, CandidatePayload, IceCandidate, OfferPayload, ParticipantId, RoomKey, SdpKind,
    SessionDescription, Signal,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Offer/answer state machine for one link.
///
/// Remote candidates that arrive before the remote description is applied
/// are held back and flushed, in arrival order, right after it is.
pub struct Negotiator {
    target: NegotiationTarget,
    self_id: ParticipantId,
    room: RoomKey,
    session: Arc<dyn MediaSession>,
    signaling: Arc<dyn SignalingOutput>,
    state: NegotiationState,
    remote_applied: bool,
    deferred: VecDeque<IceCandidate>,
}

impl Negotiator {
    pub fn new(
        target: NegotiationTarget,
        self_id: ParticipantId,
        room: RoomKey,
        session: Arc<dyn MediaSession>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            target,
            self_id,
            room,
            session,
            signaling,
            state: NegotiationState::Idle,
            remote_applied: false,
            deferred: VecDeque::new(),
        }
    }

    pub fn target(&self) -> &NegotiationTarget {
        &self.target
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn session(&self) -> &Arc<dyn MediaSession> {
        &self.session
    }

    /// Number of remote candidates waiting for the remote description.
    pub fn deferred_candidates(&self) -> usize {
        self.deferred.len()
    }

    /// Creates and sends a local offer.
    pub async fn initiate(&mut self) -> Result<(), SessionError> {
        if !self.state.can_offer() {
            return Err(ProtocolError::OfferInFlight { state: self.state }.into());
        }

        let offer = self.session.create_offer().await?;
        self.session.apply_local_description(&offer).await?;

        let signal = Signal::Offer(OfferPayload {
            self_id: self.self_id.clone(),
            room_id: self.room.clone(),
            target_id: self.target.participant().cloned(),
            offer,
        });
        self.signaling.send(signal).await?;

        self.state = NegotiationState::OfferSent;
        debug!("Offer sent to {}", self.target);
        Ok(())
    }

    /// Applies a remote offer and answers it. An offer that collides with our
    /// own pending offer wins; the local one is rolled back.
    pub async fn on_remote_offer(&mut self, offer: SessionDescription) -> Result<(), SessionError> {
        if offer.kind != SdpKind::Offer {
            return Err(ProtocolError::WrongDescription {
                expected: SdpKind::Offer,
                got: offer.kind,
            }
            .into());
        }

        match self.state {
            NegotiationState::OfferSent => {
                info!("Offer collision with {}, discarding local offer", self.target);
                self.session.rollback_local_description().await?;
            }
            NegotiationState::OfferReceived => {
                // A previous answer never completed; start over from this offer.
                warn!("New offer from {} while still answering", self.target);
            }
            NegotiationState::Idle | NegotiationState::Stable => {}
        }

        self.state = NegotiationState::OfferReceived;
        self.session.apply_remote_description(&offer).await?;
        self.remote_applied = true;
        self.flush_deferred().await?;

        let answer = self.session.create_answer().await?;
        self.session.apply_local_description(&answer).await?;

        let signal = Signal::Answer(AnswerPayload {
            self_id: self.self_id.clone(),
            room_id: self.room.clone(),
            target_id: self.target.participant().cloned(),
            answer,
        });
        self.signaling.send(signal).await?;

        self.state = NegotiationState::Stable;
        debug!("Answered offer from {}", self.target);
        Ok(())
    }

    /// Completes a negotiation we started. Answers in any other state are
    /// rejected and leave the state untouched.
    pub async fn on_remote_answer(&mut self, answer: SessionDescription) -> Result<(), SessionError> {
        if self.state != NegotiationState::OfferSent {
            return Err(ProtocolError::UnexpectedAnswer { state: self.state }.into());
        }
        if answer.kind != SdpKind::Answer {
            return Err(ProtocolError::WrongDescription {
                expected: SdpKind::Answer,
                got: answer.kind,
            }
            .into());
        }

        self.session.apply_remote_description(&answer).await?;
        self.remote_applied = true;
        self.flush_deferred().await?;

        self.state = NegotiationState::Stable;
        debug!("Negotiation with {} is stable", self.target);
        Ok(())
    }

    pub async fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), SessionError> {
        candidate.validate().map_err(InvalidCandidate::from)?;

        if !self.remote_applied {
            debug!("Deferring candidate from {} until remote description", self.target);
            self.deferred.push_back(candidate);
            return Ok(());
        }

        self.session.add_remote_candidate(&candidate).await
    }

    /// Trickles a locally gathered candidate to the counterpart.
    pub async fn on_local_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError> {
        let signal = Signal::Candidate(CandidatePayload {
            self_id: self.self_id.clone(),
            room_id: self.room.clone(),
            target_id: self.target.participant().cloned(),
            candidate,
        });
        self.signaling.send(signal).await?;
        Ok(())
    }

    pub async fn close(&mut self) {
        self.deferred.clear();
        self.session.close().await;
    }

    async fn flush_deferred(&mut self) -> Result<(), SessionError> {
        while let Some(candidate) = self.deferred.pop_front() {
            match self.session.add_remote_candidate(&candidate).await {
                Ok(()) => {}
                Err(SessionError::InvalidCandidate(e)) => {
                    warn!("Dropping deferred candidate from {}: {}", self.target, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
