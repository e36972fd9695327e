mod negotiator;
mod state;

pub use negotiator::Negotiator;
pub use state::{NegotiationState, NegotiationTarget};
