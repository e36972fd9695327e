use crate::error::{NegotiationError, SessionError};
use crate::media::{LocalTrack, TransportConfig, TransportEvents};
use async_trait::async_trait;
use huddle_core::{IceCandidate, SessionDescription};
use std::sync::Arc;

/// One media transport to a single counterpart (the SFU, or one mesh peer).
///
/// Implementations report gathered candidates, inbound tracks and transport
/// failure through the [`TransportEvents`] they were created with.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Adds the tracks to the transport. Tracks already attached are skipped.
    async fn attach_local_tracks(&self, tracks: &[LocalTrack]) -> Result<(), NegotiationError>;

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn apply_local_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn apply_remote_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), NegotiationError>;

    /// Discards a pending local offer and returns to the stable state.
    async fn rollback_local_description(&self) -> Result<(), NegotiationError>;

    /// Fails with `SessionError::InvalidCandidate` when the transport rejects
    /// the candidate itself.
    async fn add_remote_candidate(&self, candidate: &IceCandidate) -> Result<(), SessionError>;

    /// Releases the transport. Safe to call more than once.
    async fn close(&self);
}

#[async_trait]
pub trait MediaSessionFactory: Send + Sync {
    async fn create(
        &self,
        config: &TransportConfig,
        events: TransportEvents,
    ) -> Result<Arc<dyn MediaSession>, NegotiationError>;
}
