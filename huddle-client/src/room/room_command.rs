use crate::error::RoomError;
use crate::negotiator::NegotiationTarget;
use tokio::sync::oneshot;

/// Requests from the [`RoomSession`](crate::room::RoomSession) handle to the
/// room task.
#[derive(Debug)]
pub enum RoomCommand {
    /// Start (or restart) an offer towards `target`.
    Initiate {
        target: NegotiationTarget,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Close the link to `target` and release its streams.
    Hangup {
        target: NegotiationTarget,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
}
