use crate::room::RoomRegistry;
use dashmap::DashMap;
use huddle_core::{ClientMessage, ConnectionId, RoomKey, ServerMessage};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct RelayInner {
    registry: RoomRegistry,
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,
}

/// Forwards signaling frames between connections.
///
/// Each connection gets one unbounded outbound queue, so frames from one sender
/// to one target arrive in the order they were handled. Frames for connections
/// that are gone are dropped.
#[derive(Clone)]
pub struct SignalingRelay {
    inner: Arc<RelayInner>,
}

impl Default for SignalingRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingRelay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                registry: RoomRegistry::new(),
                connections: DashMap::new(),
            }),
        }
    }

    /// Registers a new transport connection and queues its `welcome` frame.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner.connections.insert(id, tx);
        info!("Connection {} registered", id);

        self.deliver(&id, ServerMessage::Welcome { id });
        (id, rx)
    }

    /// Forgets the connection and purges its room memberships. Remaining
    /// members are not told.
    pub fn disconnect(&self, id: &ConnectionId) {
        self.inner.connections.remove(id);
        let rooms = self.inner.registry.leave(id);
        info!("Connection {} gone, left {} room(s)", id, rooms.len());
    }

    pub fn handle(&self, from: ConnectionId, msg: ClientMessage) {
        debug!("{} from {}", msg.event_name(), from);

        match msg {
            ClientMessage::JoinRoom { room_id, email } => self.join_room(from, room_id, email),

            ClientMessage::CallUser { to, offer } => {
                self.deliver(&to, ServerMessage::IncomingCall { from, offer });
            }

            ClientMessage::CallAccepted { to, ans } => {
                self.deliver(&to, ServerMessage::CallAccepted { from, ans });
            }

            ClientMessage::PeerNegoNeeded { to, offer } => {
                self.deliver(&to, ServerMessage::PeerNegoNeeded { from, offer });
            }

            ClientMessage::PeerNegoDone { to, ans } => {
                self.deliver(&to, ServerMessage::PeerNegoFinal { from, ans });
            }
        }
    }

    fn join_room(&self, from: ConnectionId, room_id: RoomKey, email: String) {
        if !self.is_connected(&from) {
            warn!("Ignoring join of '{}' from disconnected {}", room_id, from);
            return;
        }

        let outcome = self.inner.registry.join(&room_id, from);
        info!("Connection {} ({}) joined room '{}'", from, email, room_id);

        self.deliver(
            &from,
            ServerMessage::RoomJoined {
                room_id: room_id.clone(),
                email: email.clone(),
            },
        );

        if !outcome.newly_joined {
            debug!("{} was already in '{}', not re-announcing", from, room_id);
            return;
        }

        for member in outcome.members.iter().filter(|member| **member != from) {
            self.deliver(
                member,
                ServerMessage::UserJoined {
                    email: email.clone(),
                    id: from,
                },
            );
        }
    }

    /// Returns `false` when the target is unknown or its queue is closed.
    fn deliver(&self, to: &ConnectionId, msg: ServerMessage) -> bool {
        let Some(peer) = self.inner.connections.get(to) else {
            warn!(
                "Dropping {} for unknown connection {}",
                msg.event_name(),
                to
            );
            return false;
        };

        if let Err(e) = peer.send(msg) {
            warn!("Connection {} stopped reading: {}", to, e);
            return false;
        }
        true
    }

    pub fn members_of(&self, room: &RoomKey) -> HashSet<ConnectionId> {
        self.inner.registry.members_of(room)
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.inner.connections.contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.inner.registry.room_count()
    }
}
