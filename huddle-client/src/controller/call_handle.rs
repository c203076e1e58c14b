use crate::controller::call_command::CallCommand;
use crate::controller::call_event::CallSnapshot;
use crate::error::CallError;
use crate::session::LocalTrack;
use huddle_core::{ConnectionId, RoomKey};
use tokio::sync::{mpsc, oneshot};

/// Cloneable front door to a running [`CallController`](crate::CallController).
///
/// Every method only queues a command; outcomes arrive as
/// [`CallEvent`](crate::CallEvent)s.
#[derive(Clone)]
pub struct CallHandle {
    tx: mpsc::UnboundedSender<CallCommand>,
}

impl CallHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<CallCommand>) -> Self {
        Self { tx }
    }

    pub fn join_room(&self, room: impl Into<RoomKey>, label: impl Into<String>) -> Result<(), CallError> {
        self.send(CallCommand::JoinRoom {
            room: room.into(),
            label: label.into(),
        })
    }

    /// Calls the participant last seen in the room.
    pub fn call(&self) -> Result<(), CallError> {
        self.send(CallCommand::Call { target: None })
    }

    pub fn call_participant(&self, target: ConnectionId) -> Result<(), CallError> {
        self.send(CallCommand::Call {
            target: Some(target),
        })
    }

    /// Sends more local tracks over the running call; one renegotiation per batch.
    pub fn attach_tracks(&self, tracks: Vec<LocalTrack>) -> Result<(), CallError> {
        self.send(CallCommand::AttachTracks(tracks))
    }

    pub fn hang_up(&self) -> Result<(), CallError> {
        self.send(CallCommand::HangUp)
    }

    pub async fn snapshot(&self) -> Result<CallSnapshot, CallError> {
        let (tx, rx) = oneshot::channel();
        self.send(CallCommand::Snapshot(tx))?;
        rx.await.map_err(|_| CallError::ControllerGone)
    }

    fn send(&self, cmd: CallCommand) -> Result<(), CallError> {
        self.tx.send(cmd).map_err(|_| CallError::ControllerGone)
    }
}
