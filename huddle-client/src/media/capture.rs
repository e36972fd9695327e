use crate::error::CaptureError;
use crate::media::LocalTrack;
use async_trait::async_trait;
use huddle_core::{StreamId, TrackKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    /// Camera plus microphone.
    #[default]
    Camera,
    /// Screen video plus system audio.
    Screen,
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => f.write_str("camera"),
            Self::Screen => f.write_str("screen"),
        }
    }
}

/// Produces the local tracks a room session publishes.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn request_capture(&self, kind: CaptureKind) -> Result<Vec<LocalTrack>, CaptureError>;
}

/// Capture source whose tracks are fed by the application through
/// [`LocalTrack::write_sample`]. Yields one audio and one video track sharing
/// a stream.
#[derive(Debug, Clone, Default)]
pub struct PushCapture {
    audio: bool,
    video: bool,
}

impl PushCapture {
    pub fn new() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }

    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }
}

#[async_trait]
impl CaptureSource for PushCapture {
    async fn request_capture(&self, kind: CaptureKind) -> Result<Vec<LocalTrack>, CaptureError> {
        if !self.audio && !self.video {
            return Err(CaptureError::DeviceUnavailable {
                kind,
                reason: "no track kinds configured".to_owned(),
            });
        }

        let stream = StreamId::new(format!("{kind}-{}", uuid::Uuid::new_v4()));
        let mut tracks = Vec::with_capacity(2);
        if self.audio {
            tracks.push(LocalTrack::new(TrackKind::Audio, stream.clone()));
        }
        if self.video {
            tracks.push(LocalTrack::new(TrackKind::Video, stream));
        }
        Ok(tracks)
    }
}
