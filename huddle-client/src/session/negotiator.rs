use crate::session::negotiator_event::NegotiatorEvents;
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::SessionDescription;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// The underlying negotiation object of one session.
#[async_trait]
pub trait Negotiator: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// The local description as it should be sent, e.g. with gathered ICE
    /// candidates folded in. `None` falls back to what was set.
    async fn local_description(&self) -> Result<Option<SessionDescription>> {
        Ok(None)
    }

    /// Drops a pending local offer and returns to the last stable state.
    async fn rollback(&self) -> Result<()>;

    async fn add_track(&self, track: LocalTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait NegotiatorFactory: Send + Sync {
    async fn create(&self, events: NegotiatorEvents) -> Result<Box<dyn Negotiator>>;
}
