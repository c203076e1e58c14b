use crate::controller::call_event::CallSnapshot;
use crate::session::LocalTrack;
use huddle_core::{ConnectionId, RoomKey};
use tokio::sync::oneshot;

/// Requests from the application to its [`CallController`](crate::CallController).
pub enum CallCommand {
    JoinRoom {
        room: RoomKey,
        label: String,
    },
    /// `None` calls the last participant seen in the room.
    Call {
        target: Option<ConnectionId>,
    },
    AttachTracks(Vec<LocalTrack>),
    HangUp,
    Snapshot(oneshot::Sender<CallSnapshot>),
}
