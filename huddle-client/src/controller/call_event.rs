use crate::error::CallError;
use crate::session::{RemoteTrack, SessionState};
use huddle_core::{ConnectionId, RoomKey};

/// A remote member of the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ConnectionId,
    /// Human label from `user-joined`; unknown for a caller that joined first.
    pub label: Option<String>,
}

/// What the controller tells the UI.
#[derive(Debug)]
pub enum CallEvent {
    /// The relay assigned our connection id.
    Connected {
        id: ConnectionId,
    },
    RoomJoined {
        room: RoomKey,
        label: String,
    },
    ParticipantJoined(Participant),
    /// A known label came back under a new connection id.
    ParticipantReconnected {
        previous: ConnectionId,
        participant: Participant,
    },
    IncomingCall {
        from: ConnectionId,
    },
    CallEstablished {
        peer: ConnectionId,
    },
    RemoteTrack {
        peer: ConnectionId,
        track: RemoteTrack,
    },
    /// `peer` is `None` when the call never got a target.
    CallFailed {
        peer: Option<ConnectionId>,
        error: CallError,
    },
    CallEnded {
        peer: ConnectionId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    /// Offer sent, no answer yet.
    Calling,
    InCall,
}

/// Point-in-time view of a controller, for UIs and tests.
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub own_id: Option<ConnectionId>,
    pub room: Option<RoomKey>,
    pub participant: Option<Participant>,
    pub phase: CallPhase,
    pub peer: Option<ConnectionId>,
    pub session_state: Option<SessionState>,
    pub local_tracks: usize,
    pub remote_tracks: usize,
}
