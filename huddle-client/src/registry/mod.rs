mod renderer;
mod stream_registry;

pub use renderer::{Renderer, RendererHandle};
pub use stream_registry::{StreamRegistry, TrackOutcome};
