mod capture;
mod local_track;
mod media_session;
mod remote_track;
mod rtc_session;
mod transport_config;
mod transport_event;

pub use capture::{CaptureKind, CaptureSource, PushCapture};
pub use local_track::{LocalMedia, LocalTrack};
pub use media_session::{MediaSession, MediaSessionFactory};
pub use remote_track::RemoteTrack;
pub use rtc_session::{RtcMediaSession, RtcSessionFactory};
pub use transport_config::TransportConfig;
pub use transport_event::{LinkId, TransportEvent, TransportEvents};
