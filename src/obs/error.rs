//! OBS control connection error types.

use tokio_tungstenite::tungstenite;

/// Errors from the obs-websocket client.
#[derive(thiserror::Error, Debug)]
pub enum ObsError {
    /// Underlying WebSocket transport error.
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    /// Malformed JSON on the wire.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected message during the Hello/Identify handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Server requires authentication but no password was configured.
    #[error("OBS requires a password but none was given")]
    AuthRequired,

    /// A request was rejected by OBS.
    #[error("OBS request failed (code {code}): {comment}")]
    RequestFailed {
        /// obs-websocket `RequestStatus` code.
        code: u16,
        /// Human-readable comment from OBS, if any.
        comment: String,
    },

    /// No response arrived within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection is closed.
    #[error("connection closed")]
    Closed,
}
