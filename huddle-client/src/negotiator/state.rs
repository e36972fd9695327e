use huddle_core::ParticipantId;
use std::fmt;

/// Offer/answer progress of one link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NegotiationState {
    #[default]
    Idle,
    OfferSent,
    OfferReceived,
    Stable,
}

impl NegotiationState {
    /// A new local offer may be started.
    pub fn can_offer(self) -> bool {
        matches!(self, Self::Idle | Self::Stable)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::OfferSent => f.write_str("offer-sent"),
            Self::OfferReceived => f.write_str("offer-received"),
            Self::Stable => f.write_str("stable"),
        }
    }
}

/// Counterpart of one negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NegotiationTarget {
    /// The room's media relay.
    Sfu,
    /// Another participant, in mesh rooms.
    Peer(ParticipantId),
}

impl NegotiationTarget {
    pub fn participant(&self) -> Option<&ParticipantId> {
        match self {
            Self::Sfu => None,
            Self::Peer(id) => Some(id),
        }
    }
}

impl fmt::Display for NegotiationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sfu => f.write_str("sfu"),
            Self::Peer(id) => write!(f, "peer {id}"),
        }
    }
}
