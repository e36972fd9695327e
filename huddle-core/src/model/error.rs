use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid payload for '{event}': {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed candidate: {0}")]
    MalformedCandidate(String),
}
