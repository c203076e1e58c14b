use crate::error::MediaError;
use crate::session::LocalTrack;
use async_trait::async_trait;

/// Where the local audio/video for a call comes from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self) -> Result<Vec<LocalTrack>, MediaError>;

    /// Called once the call no longer uses the tracks.
    fn release(&self, _tracks: &[LocalTrack]) {}
}
