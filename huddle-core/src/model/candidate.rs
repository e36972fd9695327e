use crate::model::error::WireError;
use serde::{Deserialize, Serialize};

/// A trickled connectivity candidate, shaped like the browser's
/// `RTCIceCandidateInit`.
///
/// An empty `candidate` string is the end-of-candidates marker and is valid.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// foundation, component, transport, priority, address, port, "typ", type
const MIN_CANDIDATE_FIELDS: usize = 8;

impl IceCandidate {
    pub fn new(candidate: impl Into<String>, sdp_mid: Option<String>, sdp_m_line_index: Option<u16>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid,
            sdp_m_line_index,
            username_fragment: None,
        }
    }

    pub fn is_end_of_candidates(&self) -> bool {
        self.candidate.trim().is_empty()
    }

    /// Structural check done before a candidate is queued or handed to the
    /// transport. Does not resolve addresses.
    pub fn validate(&self) -> Result<(), WireError> {
        if self.sdp_mid.is_none() && self.sdp_m_line_index.is_none() {
            return Err(WireError::MalformedCandidate(
                "neither sdpMid nor sdpMLineIndex is set".to_owned(),
            ));
        }

        if self.is_end_of_candidates() {
            return Ok(());
        }

        let line = self.candidate.trim();
        let line = line.strip_prefix("a=").unwrap_or(line);
        let Some(attributes) = line.strip_prefix("candidate:") else {
            return Err(WireError::MalformedCandidate(format!(
                "missing 'candidate:' prefix in {:?}",
                self.candidate
            )));
        };

        let fields: Vec<&str> = attributes.split_whitespace().collect();
        if fields.len() < MIN_CANDIDATE_FIELDS {
            return Err(WireError::MalformedCandidate(format!(
                "expected at least {} fields, got {}",
                MIN_CANDIDATE_FIELDS,
                fields.len()
            )));
        }
        if fields[5].parse::<u16>().is_err() {
            return Err(WireError::MalformedCandidate(format!(
                "invalid port {:?}",
                fields[5]
            )));
        }
        if fields[6] != "typ" {
            return Err(WireError::MalformedCandidate(
                "missing 'typ' attribute".to_owned(),
            ));
        }

        Ok(())
    }
}
