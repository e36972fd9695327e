use crate::config::{ClientConfig, Topology};
use crate::error::RoomError;
use crate::media::{
    CaptureSource, LocalMedia, LocalTrack, MediaSessionFactory, RtcSessionFactory,
};
use crate::negotiator::NegotiationTarget;
use crate::registry::{Renderer, StreamRegistry};
use crate::room::room_controller::{RoomController, RoomParts};
use crate::room::{RoomCommand, RoomEvent};
use crate::signaling::{SignalingConnector, WsConnector};
use huddle_core::{ParticipantId, Presence, RoomKey, Signal, TrackKind};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// External pieces a room session is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn CaptureSource>,
    pub renderer: Arc<dyn Renderer>,
    pub media: Arc<dyn MediaSessionFactory>,
    pub signaling: Arc<dyn SignalingConnector>,
}

impl Collaborators {
    /// `webrtc` media over a WebSocket signaling channel.
    pub fn new(capture: Arc<dyn CaptureSource>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            capture,
            renderer,
            media: Arc::new(RtcSessionFactory),
            signaling: Arc::new(WsConnector),
        }
    }

    pub fn with_media(mut self, media: Arc<dyn MediaSessionFactory>) -> Self {
        self.media = media;
        self
    }

    pub fn with_signaling(mut self, signaling: Arc<dyn SignalingConnector>) -> Self {
        self.signaling = signaling;
        self
    }
}

/// Handle to one joined room. The room itself runs on a background task;
/// dropping the handle leaves the room.
pub struct RoomSession {
    self_id: ParticipantId,
    room: RoomKey,
    local: LocalMedia,
    commands: mpsc::Sender<RoomCommand>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RoomSession {
    /// Captures local media, connects to the signaling server, announces
    /// `identity` in `room` and starts the room task.
    ///
    /// In SFU rooms the media session for the server is created here; call
    /// [`initiate`](Self::initiate) with [`NegotiationTarget::Sfu`] to
    /// publish. Mesh links are created on demand.
    pub async fn join(
        config: ClientConfig,
        room: RoomKey,
        identity: ParticipantId,
        collaborators: Collaborators,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RoomEvent>), RoomError> {
        let tracks = collaborators.capture.request_capture(config.capture).await?;
        let local = LocalMedia::new(tracks);
        info!(
            "Captured {} local track(s) for {} in room '{}'",
            local.tracks().len(),
            identity,
            room
        );

        let (signaling, channel_rx) = collaborators
            .signaling
            .connect(&config.signaling_url)
            .await?;

        let join = Signal::Join(Presence {
            self_id: identity.clone(),
            room_id: room.clone(),
        });
        if let Err(e) = signaling.send(join).await {
            signaling.close().await;
            return Err(e.into());
        }

        let (commands, command_rx) = mpsc::channel(32);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let mut controller = RoomController::new(RoomParts {
            self_id: identity.clone(),
            room: room.clone(),
            topology: config.topology,
            transport: config.transport,
            local: local.clone(),
            factory: collaborators.media,
            registry: StreamRegistry::new(collaborators.renderer),
            signaling: signaling.clone(),
            channel_rx,
            command_rx,
            events: events_tx,
            shutdown: shutdown.clone(),
        });

        if config.topology == Topology::Sfu
            && let Err(e) = controller.ensure_link(&NegotiationTarget::Sfu).await
        {
            signaling.close().await;
            return Err(e.into());
        }

        let task = tokio::spawn(controller.run());
        info!("{} joined room '{}'", identity, room);

        let session = Self {
            self_id: identity,
            room,
            local,
            commands,
            shutdown,
            task: Some(task),
        };
        Ok((session, events_rx))
    }

    pub fn identity(&self) -> &ParticipantId {
        &self.self_id
    }

    pub fn room(&self) -> &RoomKey {
        &self.room
    }

    pub fn local_tracks(&self) -> &[LocalTrack] {
        self.local.tracks()
    }

    /// Sends an offer to `target` and returns once it is on the wire.
    pub async fn initiate(&self, target: NegotiationTarget) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Initiate { target, reply })
            .await
            .map_err(|_| RoomError::Ended)?;
        rx.await.map_err(|_| RoomError::Ended)?
    }

    /// Closes the link to one mesh peer.
    pub async fn hangup(&self, peer: ParticipantId) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Hangup {
                target: NegotiationTarget::Peer(peer),
                reply,
            })
            .await
            .map_err(|_| RoomError::Ended)?;
        rx.await.map_err(|_| RoomError::Ended)?
    }

    /// Mutes or unmutes. Only the track flag changes; nothing is
    /// renegotiated and the source keeps running.
    pub fn set_audio_enabled(&self, enabled: bool) {
        self.local.set_enabled(TrackKind::Audio, enabled);
        info!("Audio {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn set_video_enabled(&self, enabled: bool) {
        self.local.set_enabled(TrackKind::Video, enabled);
        info!("Video {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_audio_enabled(&self) -> bool {
        self.local.is_enabled(TrackKind::Audio)
    }

    pub fn is_video_enabled(&self) -> bool {
        self.local.is_enabled(TrackKind::Video)
    }

    /// Leaves the room: any exchange in flight is abandoned, every link is
    /// closed, the channel is closed and all renderers are destroyed.
    pub async fn leave(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("Room task for '{}' ended abnormally: {}", self.room, e);
        }
        info!("{} left room '{}'", self.self_id, self.room);
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
