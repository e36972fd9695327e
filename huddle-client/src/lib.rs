pub mod config;
pub mod error;
pub mod media;
pub mod negotiator;
pub mod registry;
pub mod room;
pub mod signaling;

pub use config::{ClientConfig, Topology};
pub use error::{
    CaptureError, ChannelError, InvalidCandidate, NegotiationError, ProtocolError, RoomError,
    SessionError,
};
pub use media::{CaptureKind, CaptureSource, LocalTrack, RemoteTrack};
pub use negotiator::{NegotiationState, NegotiationTarget};
pub use registry::{Renderer, RendererHandle};
pub use room::{Collaborators, RoomEvent, RoomSession};
