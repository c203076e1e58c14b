use crate::session::SessionState;
use std::time::Duration;
use thiserror::Error;

/// Failure of a [`PeerSession`](crate::PeerSession) operation.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The remote side sent something that does not fit the exchange: the wrong
    /// description type, or an answer with no offer outstanding.
    #[error("malformed negotiation: {0}")]
    Malformed(String),

    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl NegotiationError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, NegotiationError::Malformed(_))
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media access denied: {0}")]
    Denied(String),

    #[error("no capture device available")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling connection closed")]
    Closed,

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Why a call attempt ended without the user hanging up.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("media acquisition failed: {0}")]
    Media(#[from] MediaError),

    #[error("signaling failed: {0}")]
    Signaling(#[from] SignalingError),

    #[error("payload is not a session description: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("no participant to call")]
    NoParticipant,

    #[error("a call is already in progress")]
    Busy,

    #[error("call was not accepted within {0:?}")]
    Timeout(Duration),

    #[error("peer transport failed")]
    TransportFailed,

    #[error("failed to create negotiator: {0}")]
    Setup(anyhow::Error),

    #[error("call controller has stopped")]
    ControllerGone,
}
