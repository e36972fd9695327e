use crate::error::{InvalidCandidate, NegotiationError, SessionError};
use crate::media::{
    LocalTrack, MediaSession, MediaSessionFactory, RemoteTrack, TransportConfig, TransportEvents,
};
use async_trait::async_trait;
use huddle_core::{IceCandidate, SdpKind, SessionDescription, TrackId};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// [`MediaSession`] backed by a `webrtc` peer connection.
pub struct RtcMediaSession {
    peer_connection: Arc<RTCPeerConnection>,
    attached: Mutex<HashSet<TrackId>>,
    receivers_ready: AtomicBool,
    closed: AtomicBool,
    events: TransportEvents,
}

impl RtcMediaSession {
    /// Builds the peer connection and wires its callbacks into `events`.
    pub async fn new(config: &TransportConfig, events: TransportEvents) -> Result<Self, NegotiationError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.rtc_ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let events = state_events.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", events.target(), s);
                    if matches!(s, RTCPeerConnectionState::Failed) {
                        events.disconnected().await;
                    }
                })
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let init = match candidate.to_json() {
                    Ok(init) => init,
                    Err(e) => {
                        warn!("Failed to serialize local candidate: {}", e);
                        return;
                    }
                };
                events
                    .local_candidate(IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                        username_fragment: init.username_fragment,
                    })
                    .await;
            })
        }));

        let track_events = events.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, _: Arc<RTCRtpReceiver>, _: Arc<RTCRtpTransceiver>| {
                let events = track_events.clone();

                Box::pin(async move {
                    let Some(track) = RemoteTrack::from_rtc(track) else {
                        debug!("Ignoring track of unspecified kind from {}", events.target());
                        return;
                    };
                    debug!(
                        "Remote {} track {} in stream {} from {}",
                        track.kind,
                        track.id,
                        track.stream_id,
                        events.target()
                    );
                    events.remote_track(track).await;
                })
            },
        ));

        Ok(Self {
            peer_connection,
            attached: Mutex::new(HashSet::new()),
            receivers_ready: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            events,
        })
    }

    fn ensure_open(&self) -> Result<(), NegotiationError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NegotiationError::Closed);
        }
        Ok(())
    }

    /// Makes sure the first offer announces audio and video even when nothing
    /// local of that kind is attached, so the counterpart can still send.
    async fn ensure_receivers(&self) -> Result<(), NegotiationError> {
        if self.receivers_ready.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let senders = self.peer_connection.get_senders().await;
        let mut sending = Vec::new();
        for sender in senders {
            if let Some(track) = sender.track().await {
                sending.push(track.kind());
            }
        }

        for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
            if sending.contains(&kind) {
                continue;
            }
            self.peer_connection
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await?;
        }
        Ok(())
    }
}

fn to_rtc(description: &SessionDescription) -> Result<RTCSessionDescription, NegotiationError> {
    let sdp = description.sdp.clone();
    let rtc = match description.kind {
        SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
    };
    Ok(rtc)
}

fn from_rtc(description: RTCSessionDescription) -> Result<SessionDescription, NegotiationError> {
    match description.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(description.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(description.sdp)),
        other => Err(NegotiationError::UnsupportedDescription(other.to_string())),
    }
}

#[async_trait]
impl MediaSession for RtcMediaSession {
    async fn attach_local_tracks(&self, tracks: &[LocalTrack]) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        let mut attached = self.attached.lock().await;

        for track in tracks {
            if attached.contains(track.id()) {
                continue;
            }

            let rtp_sender = self
                .peer_connection
                .add_track(track.rtp() as Arc<dyn TrackLocal + Send + Sync>)
                .await?;

            // RTCP has to be drained for the interceptors to work.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
            });

            debug!("Attached {} track {} to {}", track.kind(), track.id(), self.events.target());
            attached.insert(track.id().clone());
        }
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        self.ensure_open()?;
        self.ensure_receivers().await?;
        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        self.ensure_open()?;
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc(answer)
    }

    async fn apply_local_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.peer_connection
            .set_local_description(to_rtc(description)?)
            .await?;
        Ok(())
    }

    async fn apply_remote_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.peer_connection
            .set_remote_description(to_rtc(description)?)
            .await?;
        Ok(())
    }

    async fn rollback_local_description(&self) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        let Some(pending) = self.peer_connection.pending_local_description().await else {
            return Ok(());
        };

        // A rollback still has to carry a parseable body.
        let mut rollback = RTCSessionDescription::default();
        rollback.sdp_type = RTCSdpType::Rollback;
        rollback.sdp = pending.sdp;
        self.peer_connection.set_local_description(rollback).await?;
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &IceCandidate) -> Result<(), SessionError> {
        self.ensure_open()?;
        candidate.validate().map_err(InvalidCandidate::from)?;

        let init = RTCIceCandidateInit {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment.clone(),
        };
        match self.peer_connection.add_ice_candidate(init).await {
            Ok(()) => Ok(()),
            Err(webrtc::Error::ErrConnectionClosed) => Err(NegotiationError::Closed.into()),
            Err(e) => Err(InvalidCandidate::new(e.to_string()).into()),
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.peer_connection.close().await {
            warn!("Failed to close peer connection to {}: {}", self.events.target(), e);
        }
    }
}

/// Creates [`RtcMediaSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcSessionFactory;

#[async_trait]
impl MediaSessionFactory for RtcSessionFactory {
    async fn create(
        &self,
        config: &TransportConfig,
        events: TransportEvents,
    ) -> Result<Arc<dyn MediaSession>, NegotiationError> {
        let session = RtcMediaSession::new(config, events).await?;
        Ok(Arc::new(session))
    }
}
