use dashmap::DashMap;
use huddle_core::{ParticipantId, RoomKey};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// In-memory room membership. Rooms exist while they have members.
#[derive(Clone, Default)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomKey, HashSet<ParticipantId>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the participant was already a member.
    pub fn add(&self, room: &RoomKey, participant: ParticipantId) -> bool {
        if !self.rooms.contains_key(room) {
            info!("Creating new room: {}", room);
        }
        self.rooms.entry(room.clone()).or_default().insert(participant)
    }

    /// Returns `false` if the participant was not a member.
    pub fn remove(&self, room: &RoomKey, participant: &ParticipantId) -> bool {
        let removed = match self.rooms.get_mut(room) {
            Some(mut members) => members.remove(participant),
            None => return false,
        };

        if self.rooms.remove_if(room, |_, members| members.is_empty()).is_some() {
            info!("Room {} is empty, removing", room);
        }
        removed
    }

    pub fn contains(&self, room: &RoomKey, participant: &ParticipantId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(participant))
    }

    /// Members of `room` other than `except`.
    pub fn others(&self, room: &RoomKey, except: &ParticipantId) -> Vec<ParticipantId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().filter(|m| *m != except).cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_size(&self, room: &RoomKey) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
