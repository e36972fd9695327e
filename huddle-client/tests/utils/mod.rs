pub mod mock_signaling;

pub use fake_capture::*;
pub use fake_media::*;
pub use fake_renderer::*;
pub use mock_signaling::*;
