use crate::room::RoomManager;
use axum::extract::ws::{Message, Utf8Bytes};
use dashmap::DashMap;
use huddle_core::{ParticipantId, Presence, RoomKey, Signal, WireError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One WebSocket connection. A connection may speak for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{participant} is not a member of room '{room}' on this connection")]
    NotAMember {
        participant: ParticipantId,
        room: RoomKey,
    },

    #[error("identity {0} is already in use")]
    IdentityTaken(ParticipantId),

    #[error("{0} is not in the room")]
    UnknownTarget(ParticipantId),

    #[error("envelope has no sender")]
    Anonymous,

    #[error(transparent)]
    Wire(#[from] WireError),
}

struct Member {
    connection: ConnectionId,
    room: RoomKey,
}

struct SignalingInner {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    members: DashMap<ParticipantId, Member>,
    rooms: RoomManager,
}

/// Room membership plus envelope relay between connected clients.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                members: DashMap::new(),
                rooms: RoomManager::new(),
            }),
        }
    }

    pub fn connect(&self, tx: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = ConnectionId::new();
        self.inner.connections.insert(id, tx);
        id
    }

    /// Decodes and dispatches one text frame. Bad frames are logged and
    /// dropped.
    pub fn handle_text(&self, connection: ConnectionId, text: &str) {
        let signal = match Signal::decode(text) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Invalid envelope from {}: {}", connection, e);
                return;
            }
        };

        let event = signal.event().to_owned();
        if let Err(e) = self.dispatch(connection, signal) {
            warn!("Rejected '{}' from {}: {}", event, connection, e);
        }
    }

    pub fn dispatch(&self, connection: ConnectionId, signal: Signal) -> Result<(), RelayError> {
        match signal {
            Signal::Join(presence) => self.join(connection, presence),
            Signal::Leave(presence) => self.leave(connection, &presence),
            Signal::Unknown { event } => {
                warn!("Ignoring unknown event '{}' from {}", event, connection);
                Ok(())
            }
            other => self.relay(connection, &other).map(|_| ()),
        }
    }

    /// Registers the participant and tells the rest of the room.
    pub fn join(&self, connection: ConnectionId, presence: Presence) -> Result<(), RelayError> {
        let previous = match self.inner.members.get(&presence.self_id) {
            Some(member) if member.connection != connection => {
                return Err(RelayError::IdentityTaken(presence.self_id));
            }
            Some(member) => Some(member.room.clone()),
            None => None,
        };

        if let Some(room) = previous {
            if room == presence.room_id {
                debug!("{} re-joined room '{}'", presence.self_id, room);
                return Ok(());
            }
            self.remove_member(&presence.self_id, &room);
        }

        self.inner.members.insert(
            presence.self_id.clone(),
            Member {
                connection,
                room: presence.room_id.clone(),
            },
        );
        self.inner.rooms.add(&presence.room_id, presence.self_id.clone());
        info!(
            "{} joined room '{}' ({} member(s))",
            presence.self_id,
            presence.room_id,
            self.room_size(&presence.room_id)
        );

        self.broadcast(&presence.room_id, &presence.self_id, &Signal::Join(presence.clone()))?;
        Ok(())
    }

    pub fn leave(&self, connection: ConnectionId, presence: &Presence) -> Result<(), RelayError> {
        self.ensure_member(connection, &presence.self_id, &presence.room_id)?;
        self.remove_member(&presence.self_id, &presence.room_id);
        Ok(())
    }

    /// Forwards an offer, answer or candidate. Targeted envelopes go to one
    /// member; the rest go to everybody else in the room. Returns how many
    /// members it was delivered to.
    pub fn relay(&self, connection: ConnectionId, signal: &Signal) -> Result<usize, RelayError> {
        let (Some(sender), Some(room)) = (signal.sender(), signal.room()) else {
            return Err(RelayError::Anonymous);
        };
        self.ensure_member(connection, sender, room)?;

        match signal.target() {
            Some(target) => {
                if !self.inner.rooms.contains(room, target) {
                    return Err(RelayError::UnknownTarget(target.clone()));
                }
                let text: Utf8Bytes = signal.encode()?.into();
                debug!("{} '{}' -> {}", sender, signal.event(), target);
                Ok(usize::from(self.deliver(target, text)))
            }
            None => self.broadcast(room, sender, signal),
        }
    }

    /// Drops the connection and everything it joined.
    pub fn disconnect(&self, connection: ConnectionId) {
        self.inner.connections.remove(&connection);

        let owned: Vec<(ParticipantId, RoomKey)> = self
            .inner
            .members
            .iter()
            .filter(|m| m.value().connection == connection)
            .map(|m| (m.key().clone(), m.value().room.clone()))
            .collect();

        for (participant, room) in owned {
            info!("{} lost connection, leaving room '{}'", participant, room);
            self.remove_member(&participant, &room);
        }
    }

    pub fn room_size(&self, room: &RoomKey) -> usize {
        self.inner.rooms.room_size(room)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.room_count()
    }

    fn ensure_member(
        &self,
        connection: ConnectionId,
        participant: &ParticipantId,
        room: &RoomKey,
    ) -> Result<(), RelayError> {
        let owned = self
            .inner
            .members
            .get(participant)
            .is_some_and(|m| m.connection == connection && &m.room == room);
        if !owned {
            return Err(RelayError::NotAMember {
                participant: participant.clone(),
                room: room.clone(),
            });
        }
        Ok(())
    }

    fn remove_member(&self, participant: &ParticipantId, room: &RoomKey) {
        self.inner.members.remove(participant);
        if !self.inner.rooms.remove(room, participant) {
            return;
        }

        let leave = Signal::Leave(Presence {
            self_id: participant.clone(),
            room_id: room.clone(),
        });
        if let Err(e) = self.broadcast(room, participant, &leave) {
            error!("Failed to announce leave of {}: {}", participant, e);
        }
    }

    fn broadcast(&self, room: &RoomKey, from: &ParticipantId, signal: &Signal) -> Result<usize, RelayError> {
        let text: Utf8Bytes = signal.encode()?.into();
        let mut delivered = 0;
        for member in self.inner.rooms.others(room, from) {
            if self.deliver(&member, text.clone()) {
                delivered += 1;
            }
        }
        debug!("{} '{}' -> {} member(s) of '{}'", from, signal.event(), delivered, room);
        Ok(delivered)
    }

    fn deliver(&self, to: &ParticipantId, text: Utf8Bytes) -> bool {
        let Some(connection) = self.inner.members.get(to).map(|m| m.connection) else {
            warn!("Attempted to send signal to departed member {}", to);
            return false;
        };
        let Some(tx) = self.inner.connections.get(&connection) else {
            warn!("Attempted to send signal to disconnected member {}", to);
            return false;
        };

        if let Err(e) = tx.send(Message::Text(text)) {
            error!("Failed to send WS message to {}: {}", to, e);
            return false;
        }
        true
    }
}
