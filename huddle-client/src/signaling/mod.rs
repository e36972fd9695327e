mod channel;
mod signaling_output;

pub use channel::{SignalingChannel, WsConnector};
pub use signaling_output::{ChannelEvent, SignalingConnector, SignalingOutput};
