use crate::media::RemoteTrack;
use crate::negotiator::NegotiationTarget;
use huddle_core::IceCandidate;
use tokio::sync::mpsc;
use tracing::debug;

/// Generation number of one media session. A target that is torn down and
/// negotiated again gets a new link, so events from the old one can be told
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u64);

/// Events a media session produces for the room controller.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local candidate was gathered and must be trickled to the counterpart.
    LocalCandidate {
        target: NegotiationTarget,
        link: LinkId,
        candidate: IceCandidate,
    },

    /// The counterpart started sending a track.
    RemoteTrack {
        target: NegotiationTarget,
        link: LinkId,
        track: RemoteTrack,
    },

    /// The transport failed or was closed underneath us.
    Disconnected {
        target: NegotiationTarget,
        link: LinkId,
    },
}

impl TransportEvent {
    pub fn link(&self) -> LinkId {
        match self {
            Self::LocalCandidate { link, .. }
            | Self::RemoteTrack { link, .. }
            | Self::Disconnected { link, .. } => *link,
        }
    }

    pub fn target(&self) -> &NegotiationTarget {
        match self {
            Self::LocalCandidate { target, .. }
            | Self::RemoteTrack { target, .. }
            | Self::Disconnected { target, .. } => target,
        }
    }
}

/// Sending half handed to a media session. Tags every event with the link it
/// belongs to.
#[derive(Clone)]
pub struct TransportEvents {
    target: NegotiationTarget,
    link: LinkId,
    tx: mpsc::Sender<TransportEvent>,
}

impl TransportEvents {
    pub fn new(target: NegotiationTarget, link: LinkId, tx: mpsc::Sender<TransportEvent>) -> Self {
        Self { target, link, tx }
    }

    pub fn target(&self) -> &NegotiationTarget {
        &self.target
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    pub async fn local_candidate(&self, candidate: IceCandidate) {
        self.emit(TransportEvent::LocalCandidate {
            target: self.target.clone(),
            link: self.link,
            candidate,
        })
        .await;
    }

    pub async fn remote_track(&self, track: RemoteTrack) {
        self.emit(TransportEvent::RemoteTrack {
            target: self.target.clone(),
            link: self.link,
            track,
        })
        .await;
    }

    pub async fn disconnected(&self) {
        self.emit(TransportEvent::Disconnected {
            target: self.target.clone(),
            link: self.link,
        })
        .await;
    }

    async fn emit(&self, event: TransportEvent) {
        // The controller is gone after leave; nothing is listening any more.
        if self.tx.send(event).await.is_err() {
            debug!("Dropping transport event for {} after shutdown", self.target);
        }
    }
}
