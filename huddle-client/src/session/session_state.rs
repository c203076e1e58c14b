use std::fmt;

/// Where a [`PeerSession`](crate::PeerSession) is in its offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Local offer set, waiting for the remote answer.
    Offering,
    /// Remote offer set, local answer being produced.
    Answering,
    Connected,
    /// A later offer of ours is outstanding over a connected session.
    Renegotiating,
    Closed,
}

impl SessionState {
    /// Both descriptions have been exchanged at least once.
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Renegotiating)
    }

    pub fn has_local_offer(&self) -> bool {
        matches!(self, SessionState::Offering | SessionState::Renegotiating)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Offering => "offering",
            SessionState::Answering => "answering",
            SessionState::Connected => "connected",
            SessionState::Renegotiating => "renegotiating",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
