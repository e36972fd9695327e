use crate::media::RemoteTrack;
use huddle_core::StreamId;

/// Opaque id of one rendering target, chosen by the [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererHandle(pub u64);

/// Where inbound streams are displayed. Owned by the embedding application.
pub trait Renderer: Send + Sync {
    fn create_renderer(&self, stream: &StreamId) -> RendererHandle;

    fn attach(&self, handle: RendererHandle, track: &RemoteTrack);

    fn destroy(&self, handle: RendererHandle);
}
