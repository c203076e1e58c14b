use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// Identifies one session so events from a torn-down negotiator can be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Inbound media announced by the negotiator.
#[derive(Clone)]
pub struct RemoteTrack {
    pub stream_id: String,
    pub track_id: String,
    pub kind: RTPCodecType,
    /// RTP source, when the backend exposes one.
    pub track: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("stream_id", &self.stream_id)
            .field("track_id", &self.track_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Callbacks the negotiation object raises on its own.
#[derive(Debug, Clone)]
pub enum NegotiatorEvent {
    NegotiationNeeded,
    Track(RemoteTrack),
    TransportFailed,
}

/// Sink handed to a negotiator at creation; tags every event with its session.
#[derive(Clone)]
pub struct NegotiatorEvents {
    session: SessionId,
    tx: mpsc::UnboundedSender<(SessionId, NegotiatorEvent)>,
}

impl NegotiatorEvents {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<(SessionId, NegotiatorEvent)>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn emit(&self, event: NegotiatorEvent) {
        // The controller may already be gone; nothing left to tell.
        let _ = self.tx.send((self.session, event));
    }
}
