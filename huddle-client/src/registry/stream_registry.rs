use crate::media::RemoteTrack;
use crate::negotiator::NegotiationTarget;
use crate::registry::{Renderer, RendererHandle};
use huddle_core::{StreamId, TrackId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// What [`StreamRegistry::on_track`] did with a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// First track of an unseen stream; a renderer was created.
    NewStream(RendererHandle),
    /// Another track for a stream that already has a renderer.
    TrackAdded(RendererHandle),
    /// The track was already attached; nothing changed.
    Duplicate(RendererHandle),
}

struct StreamEntry {
    handle: RendererHandle,
    tracks: HashSet<TrackId>,
}

/// Keeps exactly one rendering target per inbound stream.
///
/// Stream ids are only unique within one transport connection, so entries
/// are keyed by the link that delivered them as well.
pub struct StreamRegistry {
    renderer: Arc<dyn Renderer>,
    streams: HashMap<(NegotiationTarget, StreamId), StreamEntry>,
}

impl StreamRegistry {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            streams: HashMap::new(),
        }
    }

    pub fn on_track(&mut self, owner: &NegotiationTarget, track: &RemoteTrack) -> TrackOutcome {
        let key = (owner.clone(), track.stream_id.clone());

        if let Some(entry) = self.streams.get_mut(&key) {
            if !entry.tracks.insert(track.id.clone()) {
                debug!("Track {} already attached to stream {}", track.id, track.stream_id);
                return TrackOutcome::Duplicate(entry.handle);
            }
            self.renderer.attach(entry.handle, track);
            debug!("Added {} track {} to stream {}", track.kind, track.id, track.stream_id);
            return TrackOutcome::TrackAdded(entry.handle);
        }

        let handle = self.renderer.create_renderer(&track.stream_id);
        self.renderer.attach(handle, track);
        info!("New stream {} from {}", track.stream_id, owner);

        self.streams.insert(
            key,
            StreamEntry {
                handle,
                tracks: HashSet::from([track.id.clone()]),
            },
        );
        TrackOutcome::NewStream(handle)
    }

    /// Destroys the renderers of every stream delivered by `owner`.
    pub fn release_owner(&mut self, owner: &NegotiationTarget) -> usize {
        let keys: Vec<_> = self
            .streams
            .keys()
            .filter(|(o, _)| o == owner)
            .cloned()
            .collect();

        for key in &keys {
            if let Some(entry) = self.streams.remove(key) {
                self.renderer.destroy(entry.handle);
            }
        }
        keys.len()
    }

    /// Destroys every renderer. The registry is empty afterwards.
    pub fn release_all(&mut self) -> usize {
        let released = self.streams.len();
        for (_, entry) in self.streams.drain() {
            self.renderer.destroy(entry.handle);
        }
        if released > 0 {
            info!("Released {} stream renderer(s)", released);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn contains(&self, owner: &NegotiationTarget, stream: &StreamId) -> bool {
        self.streams.contains_key(&(owner.clone(), stream.clone()))
    }

    pub fn track_count(&self, owner: &NegotiationTarget, stream: &StreamId) -> usize {
        self.streams
            .get(&(owner.clone(), stream.clone()))
            .map_or(0, |entry| entry.tracks.len())
    }
}
