mod room_command;
mod room_controller;
mod room_event;
mod room_session;

pub use room_command::*;
pub use room_event::*;
pub use room_session::*;
