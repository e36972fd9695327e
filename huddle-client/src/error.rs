use crate::media::CaptureKind;
use crate::negotiator::NegotiationState;
use huddle_core::{ParticipantId, RoomKey, SdpKind, WireError};
use thiserror::Error;

/// Local device or permission failure. Aborts `join`.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{0} capture was denied")]
    Denied(CaptureKind),

    #[error("no {kind} device available: {reason}")]
    DeviceUnavailable { kind: CaptureKind, reason: String },
}

/// Signaling connection failure. Terminates the room session.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("signaling channel is closed")]
    Closed,

    #[error("invalid signaling url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    #[error("signaling transport failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// The transport refused a description operation. Fatal for one link only.
#[derive(Debug, Clone, Error)]
pub enum NegotiationError {
    #[error("media session is closed")]
    Closed,

    #[error("transport rejected the operation: {0}")]
    Transport(String),

    #[error("transport produced an unsupported description type '{0}'")]
    UnsupportedDescription(String),
}

impl From<webrtc::Error> for NegotiationError {
    fn from(e: webrtc::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
#[error("invalid candidate: {reason}")]
pub struct InvalidCandidate {
    pub reason: String,
}

impl InvalidCandidate {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<WireError> for InvalidCandidate {
    fn from(e: WireError) -> Self {
        match e {
            WireError::MalformedCandidate(reason) => Self { reason },
            other => Self {
                reason: other.to_string(),
            },
        }
    }
}

/// A message that is well formed but arrives out of turn.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("unexpected answer while {state}")]
    UnexpectedAnswer { state: NegotiationState },

    #[error("cannot start an offer while {state}")]
    OfferInFlight { state: NegotiationState },

    #[error("expected {expected} description, got {got}")]
    WrongDescription { expected: SdpKind, got: SdpKind },

    #[error("envelope for room '{0}' does not belong to this session")]
    ForeignRoom(RoomKey),

    #[error("no negotiation in progress with {0}")]
    UnknownPeer(ParticipantId),

    #[error("this topology cannot negotiate with {0}")]
    UnsupportedTarget(String),
}

/// Outcome of one negotiator step.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    InvalidCandidate(#[from] InvalidCandidate),
}

impl SessionError {
    /// The link to this peer cannot continue; other links are unaffected.
    pub fn is_fatal_for_link(&self) -> bool {
        matches!(self, Self::Negotiation(_))
    }

    /// Nothing in the room can continue.
    pub fn is_fatal_for_room(&self) -> bool {
        matches!(self, Self::Channel(_))
    }
}

/// Errors surfaced by the public room API.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    InvalidCandidate(#[from] InvalidCandidate),

    #[error("room session has ended")]
    Ended,
}

impl From<SessionError> for RoomError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Negotiation(e) => Self::Negotiation(e),
            SessionError::Channel(e) => Self::Channel(e),
            SessionError::Protocol(e) => Self::Protocol(e),
            SessionError::InvalidCandidate(e) => Self::InvalidCandidate(e),
        }
    }
}
