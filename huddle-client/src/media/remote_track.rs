use huddle_core::{StreamId, TrackId, TrackKind};
use std::fmt;
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// An inbound track together with the stream it belongs to.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: TrackId,
    pub stream_id: StreamId,
    pub kind: TrackKind,
    /// The live RTP source. `None` when the track was not produced by a
    /// `webrtc` peer connection.
    pub rtp: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    pub fn new(id: TrackId, stream_id: StreamId, kind: TrackKind) -> Self {
        Self {
            id,
            stream_id,
            kind,
            rtp: None,
        }
    }

    pub(crate) fn from_rtc(track: Arc<TrackRemote>) -> Option<Self> {
        let kind = match track.kind() {
            RTPCodecType::Audio => TrackKind::Audio,
            RTPCodecType::Video => TrackKind::Video,
            _ => return None,
        };

        Some(Self {
            id: TrackId::new(track.id()),
            stream_id: StreamId::new(track.stream_id()),
            kind,
            rtp: Some(track),
        })
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .field("live", &self.rtp.is_some())
            .finish()
    }
}
