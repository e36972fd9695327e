use bytes::Bytes;
use huddle_core::{StreamId, TrackId, TrackKind};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// An outbound track fed by the application with encoded samples.
///
/// Clones share the underlying RTP track and the enabled flag.
#[derive(Clone)]
pub struct LocalTrack {
    id: TrackId,
    stream_id: StreamId,
    kind: TrackKind,
    rtp: Arc<TrackLocalStaticSample>,
    enabled: Arc<AtomicBool>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, stream_id: StreamId) -> Self {
        let id = TrackId::new(format!("{kind}-{}", uuid::Uuid::new_v4()));
        let capability = match kind {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90_000,
                ..Default::default()
            },
        };
        let rtp = Arc::new(TrackLocalStaticSample::new(
            capability,
            id.to_string(),
            stream_id.to_string(),
        ));

        Self {
            id,
            stream_id,
            kind,
            rtp,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn rtp(&self) -> Arc<TrackLocalStaticSample> {
        Arc::clone(&self.rtp)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Writes one encoded sample. Returns `false` when the track is disabled
    /// and the sample was dropped.
    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> Result<bool, webrtc::Error> {
        if !self.is_enabled() {
            return Ok(false);
        }

        self.rtp
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(true)
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// The captured tracks of one room session.
#[derive(Debug, Clone, Default)]
pub struct LocalMedia {
    tracks: Arc<Vec<LocalTrack>>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self {
            tracks: Arc::new(tracks),
        }
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    /// Flips the enabled flag of every track of `kind`. No renegotiation.
    pub fn set_enabled(&self, kind: TrackKind, enabled: bool) {
        for track in self.tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
        }
    }

    /// True only if at least one track of `kind` exists and all of them are
    /// enabled.
    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        let mut tracks = self.tracks.iter().filter(|t| t.kind() == kind).peekable();
        tracks.peek().is_some() && tracks.all(LocalTrack::is_enabled)
    }

    /// Clears mute and camera-off: every track back to enabled.
    pub fn reset(&self) {
        for track in self.tracks.iter() {
            track.set_enabled(true);
        }
    }
}
