use crate::media::RemoteTrack;
use crate::negotiator::NegotiationTarget;
use crate::registry::RendererHandle;
use huddle_core::{ParticipantId, StreamId};

/// What happened in the room, in the order the room task observed it.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    ParticipantJoined(ParticipantId),

    ParticipantLeft(ParticipantId),

    /// An offer/answer exchange with `target` reached the stable state.
    Negotiated { target: NegotiationTarget },

    /// First track of a stream arrived and a renderer was created for it.
    StreamAdded {
        owner: NegotiationTarget,
        stream_id: StreamId,
        renderer: RendererHandle,
    },

    /// A track was attached to a stream's renderer. Also sent for the first
    /// track of a stream, after `StreamAdded`.
    TrackAdded {
        owner: NegotiationTarget,
        track: RemoteTrack,
    },

    /// The link to `target` failed and was torn down. Other links go on.
    PeerFailed {
        target: NegotiationTarget,
        reason: String,
    },

    /// The signaling connection is gone; the session is over.
    ChannelClosed { reason: Option<String> },
}
