use crate::error::ChannelError;
use crate::media::{CaptureKind, TransportConfig};
use huddle_core::utils::SIGNALING_PATH;
use serde::{Deserialize, Serialize};
use url::Url;

/// How media flows between participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// One link to the room's forwarding server.
    #[default]
    Sfu,
    /// One link per remote participant.
    Mesh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub signaling_url: String,
    pub topology: Topology,
    pub capture: CaptureKind,
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: format!("ws://127.0.0.1:8080{SIGNALING_PATH}"),
            topology: Topology::default(),
            capture: CaptureKind::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Derives the signaling endpoint from the origin the client was served
    /// from. Secure origins get a secure socket.
    pub fn for_origin(origin: &str) -> Result<Self, ChannelError> {
        let invalid = |reason: String| ChannelError::InvalidUrl {
            url: origin.to_owned(),
            reason,
        };

        let mut url = Url::parse(origin).map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };
        url.set_scheme(scheme)
            .map_err(|_| invalid(format!("cannot switch to '{scheme}'")))?;
        url.set_path(SIGNALING_PATH);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            signaling_url: url.to_string(),
            ..Self::default()
        })
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_capture(mut self, capture: CaptureKind) -> Self {
        self.capture = capture;
        self
    }
}
