mod candidate;
mod description;
mod error;
mod participant;
mod room;
mod signaling;
mod stream;

pub use candidate::IceCandidate;
pub use description::{SdpKind, SessionDescription};
pub use error::WireError;
pub use participant::ParticipantId;
pub use room::RoomKey;
pub use signaling::{
    AnswerPayload, CandidatePayload, IceServerConfig, OfferPayload, Presence, Signal,
};
pub use stream::{StreamId, TrackId, TrackKind};
