use crate::config::Topology;
use crate::error::{ProtocolError, RoomError, SessionError};
use crate::media::{
    LinkId, LocalMedia, MediaSessionFactory, TransportConfig, TransportEvent, TransportEvents,
};
use crate::negotiator::{NegotiationState, NegotiationTarget, Negotiator};
use crate::registry::{StreamRegistry, TrackOutcome};
use crate::room::{RoomCommand, RoomEvent};
use crate::signaling::{ChannelEvent, SignalingOutput};
use huddle_core::{ParticipantId, Presence, RoomKey, Signal};
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct Link {
    id: LinkId,
    negotiator: Negotiator,
}

/// Everything a room task needs, assembled by `RoomSession::join`.
pub(crate) struct RoomParts {
    pub self_id: ParticipantId,
    pub room: RoomKey,
    pub topology: Topology,
    pub transport: TransportConfig,
    pub local: LocalMedia,
    pub factory: Arc<dyn MediaSessionFactory>,
    pub registry: StreamRegistry,
    pub signaling: Arc<dyn SignalingOutput>,
    pub channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    pub command_rx: mpsc::Receiver<RoomCommand>,
    pub events: mpsc::UnboundedSender<RoomEvent>,
    pub shutdown: CancellationToken,
}

/// The room actor. Owns every negotiator, the stream registry and the
/// signaling receiver; handles one event at a time, so steps for the same
/// link never interleave.
pub(crate) struct RoomController {
    self_id: ParticipantId,
    room: RoomKey,
    topology: Topology,
    transport: TransportConfig,
    local: LocalMedia,
    factory: Arc<dyn MediaSessionFactory>,
    registry: StreamRegistry,
    signaling: Arc<dyn SignalingOutput>,
    channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    command_rx: mpsc::Receiver<RoomCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    events: mpsc::UnboundedSender<RoomEvent>,
    shutdown: CancellationToken,
    links: HashMap<NegotiationTarget, Link>,
    /// Targets whose link was closed. Late candidates for them are dropped
    /// instead of opening a fresh connection.
    retired: HashSet<NegotiationTarget>,
    next_link: u64,
}

impl RoomController {
    pub(crate) fn new(parts: RoomParts) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(256);

        Self {
            self_id: parts.self_id,
            room: parts.room,
            topology: parts.topology,
            transport: parts.transport,
            local: parts.local,
            factory: parts.factory,
            registry: parts.registry,
            signaling: parts.signaling,
            channel_rx: parts.channel_rx,
            command_rx: parts.command_rx,
            transport_rx,
            transport_tx,
            events: parts.events,
            shutdown: parts.shutdown,
            links: HashMap::new(),
            retired: HashSet::new(),
            next_link: 0,
        }
    }

    /// Creates the media session for `target` unless it already exists.
    pub(crate) async fn ensure_link(&mut self, target: &NegotiationTarget) -> Result<(), SessionError> {
        if self.links.contains_key(target) {
            return Ok(());
        }

        match (self.topology, target) {
            (Topology::Sfu, NegotiationTarget::Sfu) | (Topology::Mesh, NegotiationTarget::Peer(_)) => {}
            _ => return Err(ProtocolError::UnsupportedTarget(target.to_string()).into()),
        }

        self.next_link += 1;
        let id = LinkId(self.next_link);
        let events = TransportEvents::new(target.clone(), id, self.transport_tx.clone());

        let session = self.factory.create(&self.transport, events).await?;
        if let Err(e) = session.attach_local_tracks(self.local.tracks()).await {
            session.close().await;
            return Err(e.into());
        }

        let negotiator = Negotiator::new(
            target.clone(),
            self.self_id.clone(),
            self.room.clone(),
            session,
            self.signaling.clone(),
        );
        self.links.insert(target.clone(), Link { id, negotiator });
        self.retired.remove(target);
        info!("Opened link to {} in room '{}'", target, self.room);
        Ok(())
    }

    pub(crate) async fn run(mut self) {
        info!("Room '{}' event loop started for {}", self.room, self.self_id);
        let shutdown = self.shutdown.clone();

        loop {
            let flow = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Leave requested");
                    ControlFlow::Break(())
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => shutdown
                        .run_until_cancelled(self.handle_command(cmd))
                        .await
                        .unwrap_or(ControlFlow::Break(())),
                    None => {
                        info!("Room handle dropped. Shutting down room.");
                        ControlFlow::Break(())
                    }
                },

                evt = self.channel_rx.recv() => match evt {
                    Some(ChannelEvent::Message(signal)) => shutdown
                        .run_until_cancelled(self.handle_signal(signal))
                        .await
                        .unwrap_or(ControlFlow::Break(())),
                    Some(ChannelEvent::Closed(reason)) => {
                        self.on_channel_closed(reason.map(|e| e.to_string()));
                        ControlFlow::Break(())
                    }
                    None => {
                        self.on_channel_closed(None);
                        ControlFlow::Break(())
                    }
                },

                evt = self.transport_rx.recv() => match evt {
                    Some(evt) => shutdown
                        .run_until_cancelled(self.handle_transport_event(evt))
                        .await
                        .unwrap_or(ControlFlow::Break(())),
                    None => {
                        warn!("Transport channel closed unexpectedly");
                        ControlFlow::Break(())
                    }
                },
            };

            if flow.is_break() {
                break;
            }
        }

        self.teardown().await;
        info!("Room '{}' event loop finished", self.room);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Initiate { target, reply } => {
                let result = self.initiate(&target).await;
                let flow = match &result {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(e) => self.apply_policy(&target, e).await,
                };
                let _ = reply.send(result.map_err(RoomError::from));
                flow
            }

            RoomCommand::Hangup { target, reply } => {
                let result: Result<(), RoomError> = if self.links.contains_key(&target) {
                    self.close_link(&target).await;
                    Ok(())
                } else {
                    let err = match target.participant() {
                        Some(peer) => ProtocolError::UnknownPeer(peer.clone()),
                        None => ProtocolError::UnsupportedTarget(target.to_string()),
                    };
                    Err(err.into())
                };
                let _ = reply.send(result);
                ControlFlow::Continue(())
            }
        }
    }

    async fn initiate(&mut self, target: &NegotiationTarget) -> Result<(), SessionError> {
        self.ensure_link(target).await?;
        let Some(link) = self.links.get_mut(target) else {
            return Err(ProtocolError::UnsupportedTarget(target.to_string()).into());
        };
        info!("Starting negotiation with {}", target);
        link.negotiator.initiate().await
    }

    async fn handle_signal(&mut self, signal: Signal) -> ControlFlow<()> {
        if let Signal::Unknown { event } = &signal {
            warn!("Ignoring unknown signaling event '{}'", event);
            return ControlFlow::Continue(());
        }

        if signal.is_from_server() {
            return self.handle_server_signal(signal).await;
        }

        if let Some(room) = signal.room()
            && room != &self.room
        {
            warn!("{}", ProtocolError::ForeignRoom(room.clone()));
            return ControlFlow::Continue(());
        }

        let Some(sender) = signal.sender().cloned() else {
            return ControlFlow::Continue(());
        };
        if sender == self.self_id {
            debug!("Ignoring echo of own '{}'", signal.event());
            return ControlFlow::Continue(());
        }
        if let Some(target) = signal.target()
            && target != &self.self_id
        {
            debug!("Ignoring '{}' addressed to {}", signal.event(), target);
            return ControlFlow::Continue(());
        }

        let target = match self.topology {
            Topology::Sfu => NegotiationTarget::Sfu,
            Topology::Mesh => NegotiationTarget::Peer(sender.clone()),
        };

        match signal {
            Signal::Join(_) => {
                info!("{} joined room '{}'", sender, self.room);
                self.emit(RoomEvent::ParticipantJoined(sender));
                ControlFlow::Continue(())
            }

            Signal::Leave(_) => {
                info!("{} left room '{}'", sender, self.room);
                if self.topology == Topology::Mesh {
                    self.close_link(&target).await;
                }
                self.emit(RoomEvent::ParticipantLeft(sender));
                ControlFlow::Continue(())
            }

            Signal::Offer(payload) => {
                let result = self.on_offer(&target, payload.offer).await;
                self.settle(&target, result).await
            }

            Signal::Answer(payload) => {
                let result = self.on_answer(&target, payload.answer).await;
                self.settle(&target, result).await
            }

            Signal::Candidate(payload) => {
                let result = self.on_candidate(&target, payload.candidate).await;
                match result {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(e) => self.apply_policy(&target, &e).await,
                }
            }

            Signal::ServerOffer(_)
            | Signal::ServerAnswer(_)
            | Signal::ServerCandidate(_)
            | Signal::Unknown { .. } => ControlFlow::Continue(()),
        }
    }

    /// Bare envelopes pushed by a media server. They name no sender, so they
    /// only make sense on the SFU link.
    async fn handle_server_signal(&mut self, signal: Signal) -> ControlFlow<()> {
        let target = NegotiationTarget::Sfu;
        if self.topology != Topology::Sfu {
            warn!(
                "Ignoring server '{}': {}",
                signal.event(),
                ProtocolError::UnsupportedTarget(target.to_string())
            );
            return ControlFlow::Continue(());
        }

        match signal {
            Signal::ServerOffer(offer) => {
                let result = self.on_offer(&target, offer).await;
                self.settle(&target, result).await
            }
            Signal::ServerAnswer(answer) => {
                let result = self.on_answer(&target, answer).await;
                self.settle(&target, result).await
            }
            Signal::ServerCandidate(candidate) => match self.on_candidate(&target, candidate).await {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => self.apply_policy(&target, &e).await,
            },
            _ => ControlFlow::Continue(()),
        }
    }

    async fn on_offer(
        &mut self,
        target: &NegotiationTarget,
        offer: huddle_core::SessionDescription,
    ) -> Result<(), SessionError> {
        self.ensure_link(target).await?;
        match self.links.get_mut(target) {
            Some(link) => link.negotiator.on_remote_offer(offer).await,
            None => Ok(()),
        }
    }

    async fn on_answer(
        &mut self,
        target: &NegotiationTarget,
        answer: huddle_core::SessionDescription,
    ) -> Result<(), SessionError> {
        match self.links.get_mut(target) {
            Some(link) => link.negotiator.on_remote_answer(answer).await,
            None => Err(ProtocolError::UnexpectedAnswer {
                state: NegotiationState::Idle,
            }
            .into()),
        }
    }

    async fn on_candidate(
        &mut self,
        target: &NegotiationTarget,
        candidate: huddle_core::IceCandidate,
    ) -> Result<(), SessionError> {
        if !self.links.contains_key(target) && self.retired.contains(target) {
            debug!("Dropping late candidate for closed link to {}", target);
            return Ok(());
        }
        self.ensure_link(target).await?;
        match self.links.get_mut(target) {
            Some(link) => link.negotiator.on_remote_candidate(candidate).await,
            None => Ok(()),
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> ControlFlow<()> {
        let current = self
            .links
            .get(event.target())
            .is_some_and(|link| link.id == event.link());
        if !current {
            debug!("Dropping event from retired link {:?} to {}", event.link(), event.target());
            return ControlFlow::Continue(());
        }

        match event {
            TransportEvent::LocalCandidate { target, candidate, .. } => {
                let result = match self.links.get(&target) {
                    Some(link) => link.negotiator.on_local_candidate(candidate).await,
                    None => Ok(()),
                };
                match result {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(e) => self.apply_policy(&target, &e).await,
                }
            }

            TransportEvent::RemoteTrack { target, track, .. } => {
                match self.registry.on_track(&target, &track) {
                    TrackOutcome::NewStream(renderer) => {
                        self.emit(RoomEvent::StreamAdded {
                            owner: target.clone(),
                            stream_id: track.stream_id.clone(),
                            renderer,
                        });
                        self.emit(RoomEvent::TrackAdded { owner: target, track });
                    }
                    TrackOutcome::TrackAdded(_) => {
                        self.emit(RoomEvent::TrackAdded { owner: target, track });
                    }
                    TrackOutcome::Duplicate(_) => {}
                }
                ControlFlow::Continue(())
            }

            TransportEvent::Disconnected { target, .. } => {
                error!("Transport to {} failed", target);
                self.fail_link(&target, "transport failed".to_owned()).await;
                ControlFlow::Continue(())
            }
        }
    }

    /// Reports a finished offer/answer step.
    async fn settle(
        &mut self,
        target: &NegotiationTarget,
        result: Result<(), SessionError>,
    ) -> ControlFlow<()> {
        match result {
            Ok(()) => {
                let stable = self
                    .links
                    .get(target)
                    .is_some_and(|link| link.negotiator.state() == NegotiationState::Stable);
                if stable {
                    info!("Negotiation with {} complete", target);
                    self.emit(RoomEvent::Negotiated {
                        target: target.clone(),
                    });
                }
                ControlFlow::Continue(())
            }
            Err(e) => self.apply_policy(target, &e).await,
        }
    }

    /// Protocol and candidate errors are logged; a negotiation failure takes
    /// down one link; a channel failure ends the room.
    async fn apply_policy(&mut self, target: &NegotiationTarget, e: &SessionError) -> ControlFlow<()> {
        if e.is_fatal_for_room() {
            error!("Signaling failed while talking to {}: {}", target, e);
            self.emit(RoomEvent::ChannelClosed {
                reason: Some(e.to_string()),
            });
            return ControlFlow::Break(());
        }

        if e.is_fatal_for_link() {
            error!("Negotiation with {} failed: {}", target, e);
            self.fail_link(target, e.to_string()).await;
            return ControlFlow::Continue(());
        }

        warn!("Ignoring message from {}: {}", target, e);
        ControlFlow::Continue(())
    }

    async fn fail_link(&mut self, target: &NegotiationTarget, reason: String) {
        self.close_link(target).await;
        self.emit(RoomEvent::PeerFailed {
            target: target.clone(),
            reason,
        });
    }

    async fn close_link(&mut self, target: &NegotiationTarget) {
        let Some(mut link) = self.links.remove(target) else {
            return;
        };
        self.retired.insert(target.clone());
        link.negotiator.close().await;
        let released = self.registry.release_owner(target);
        info!("Closed link to {} ({} stream(s) released)", target, released);
    }

    fn on_channel_closed(&mut self, reason: Option<String>) {
        match &reason {
            Some(reason) => error!("Signaling channel lost: {}", reason),
            None => info!("Signaling channel closed by server"),
        }
        self.emit(RoomEvent::ChannelClosed { reason });
    }

    async fn teardown(&mut self) {
        let leave = Signal::Leave(Presence {
            self_id: self.self_id.clone(),
            room_id: self.room.clone(),
        });
        if let Err(e) = self.signaling.send(leave).await {
            debug!("Leave not delivered: {}", e);
        }

        for (target, mut link) in self.links.drain() {
            debug!("Closing link to {}", target);
            link.negotiator.close().await;
        }
        self.signaling.close().await;

        let released = self.registry.release_all();
        self.local.reset();
        info!(
            "Left room '{}' ({} stream(s) released)",
            self.room, released
        );
    }

    fn emit(&self, event: RoomEvent) {
        if self.events.send(event).is_err() {
            debug!("Room event receiver dropped");
        }
    }
}
