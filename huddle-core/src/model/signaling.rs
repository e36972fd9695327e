use crate::model::candidate::IceCandidate;
use crate::model::description::SessionDescription;
use crate::model::error::WireError;
use crate::model::participant::ParticipantId;
use crate::model::room::RoomKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub self_id: ParticipantId,
    pub room_id: RoomKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferPayload {
    pub self_id: ParticipantId,
    pub room_id: RoomKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ParticipantId>,
    pub offer: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub self_id: ParticipantId,
    pub room_id: RoomKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ParticipantId>,
    pub answer: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub self_id: ParticipantId,
    pub room_id: RoomKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ParticipantId>,
    pub candidate: IceCandidate,
}

/// One signaling envelope, `{"event": <tag>, "data": <payload>}` on the wire.
///
/// Decoding accepts every tag spelling seen in deployed clients (`join` and
/// `joinRoom`, `candidate` and `ice-candidate`); encoding always emits the
/// first spelling of each pair below.
///
/// A media server sends `offer`, `answer` and `candidate` with the bare
/// description or candidate as `data` and no participant fields; those decode
/// to the `Server*` variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Join(Presence),
    Leave(Presence),
    Offer(OfferPayload),
    Answer(AnswerPayload),
    Candidate(CandidatePayload),
    /// Offer pushed by a media server with the bare description as `data`.
    ServerOffer(SessionDescription),
    /// Answer from a media server, bare description as `data`.
    ServerAnswer(SessionDescription),
    /// Candidate from a media server, bare candidate as `data`.
    ServerCandidate(IceCandidate),
    /// A tag this build does not understand. Kept so callers can log it.
    Unknown { event: String },
}

#[derive(Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Server-originated payloads carry no `self_id`.
fn is_bare(data: &serde_json::Value) -> bool {
    data.as_object().is_some_and(|map| !map.contains_key("self_id"))
}

fn payload<T: DeserializeOwned>(event: &str, data: serde_json::Value) -> Result<T, WireError> {
    serde_json::from_value(data).map_err(|source| WireError::Payload {
        event: event.to_owned(),
        source,
    })
}

impl Signal {
    pub fn decode(text: &str) -> Result<Self, WireError> {
        let RawEnvelope { event, data } = serde_json::from_str(text)?;

        let signal = match event.as_str() {
            "joinRoom" | "join" => Self::Join(payload(&event, data)?),
            "leaveRoom" | "leave" => Self::Leave(payload(&event, data)?),
            "offer" if is_bare(&data) => Self::ServerOffer(payload(&event, data)?),
            "offer" => Self::Offer(payload(&event, data)?),
            "answer" if is_bare(&data) => Self::ServerAnswer(payload(&event, data)?),
            "answer" => Self::Answer(payload(&event, data)?),
            "candidate" | "ice-candidate" if is_bare(&data) => {
                Self::ServerCandidate(payload(&event, data)?)
            }
            "candidate" | "ice-candidate" => Self::Candidate(payload(&event, data)?),
            _ => Self::Unknown { event },
        };

        Ok(signal)
    }

    pub fn encode(&self) -> Result<String, WireError> {
        let event = self.event();
        let json = match self {
            Self::Join(p) | Self::Leave(p) => serde_json::to_string(&Envelope { event, data: p }),
            Self::Offer(p) => serde_json::to_string(&Envelope { event, data: p }),
            Self::Answer(p) => serde_json::to_string(&Envelope { event, data: p }),
            Self::Candidate(p) => serde_json::to_string(&Envelope { event, data: p }),
            Self::ServerOffer(d) | Self::ServerAnswer(d) => {
                serde_json::to_string(&Envelope { event, data: d })
            }
            Self::ServerCandidate(c) => serde_json::to_string(&Envelope { event, data: c }),
            Self::Unknown { .. } => serde_json::to_string(&Envelope {
                event,
                data: &serde_json::Value::Null,
            }),
        }?;
        Ok(json)
    }

    pub fn event(&self) -> &str {
        match self {
            Self::Join(_) => "joinRoom",
            Self::Leave(_) => "leaveRoom",
            Self::Offer(_) | Self::ServerOffer(_) => "offer",
            Self::Answer(_) | Self::ServerAnswer(_) => "answer",
            Self::Candidate(_) | Self::ServerCandidate(_) => "candidate",
            Self::Unknown { event } => event,
        }
    }

    pub fn sender(&self) -> Option<&ParticipantId> {
        match self {
            Self::Join(p) | Self::Leave(p) => Some(&p.self_id),
            Self::Offer(p) => Some(&p.self_id),
            Self::Answer(p) => Some(&p.self_id),
            Self::Candidate(p) => Some(&p.self_id),
            _ => None,
        }
    }

    pub fn room(&self) -> Option<&RoomKey> {
        match self {
            Self::Join(p) | Self::Leave(p) => Some(&p.room_id),
            Self::Offer(p) => Some(&p.room_id),
            Self::Answer(p) => Some(&p.room_id),
            Self::Candidate(p) => Some(&p.room_id),
            _ => None,
        }
    }

    /// True for the bare payloads a media server sends.
    pub fn is_from_server(&self) -> bool {
        matches!(
            self,
            Self::ServerOffer(_) | Self::ServerAnswer(_) | Self::ServerCandidate(_)
        )
    }

    /// The single participant this envelope is addressed to, if any.
    /// `None` means "everyone else in the room".
    pub fn target(&self) -> Option<&ParticipantId> {
        match self {
            Self::Offer(p) => p.target_id.as_ref(),
            Self::Answer(p) => p.target_id.as_ref(),
            Self::Candidate(p) => p.target_id.as_ref(),
            _ => None,
        }
    }
}
