use dashmap::DashMap;
use huddle_core::{ConnectionId, RoomKey};
use std::collections::HashSet;
use tracing::{debug, info};

/// Result of [`RoomRegistry::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// `false` when the connection was already a member (the join was a no-op).
    pub newly_joined: bool,
    /// Members of the room after the join, the joiner included.
    pub members: Vec<ConnectionId>,
}

/// Room key -> member connections, plus the reverse index used on disconnect.
///
/// Rooms exist only while they have members.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomKey, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<RoomKey>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, room: &RoomKey, connection: ConnectionId) -> JoinOutcome {
        let (newly_joined, members) = {
            let mut members = self.rooms.entry(room.clone()).or_insert_with(|| {
                info!("Creating room '{}'", room);
                HashSet::new()
            });
            let newly_joined = members.insert(connection);
            (newly_joined, members.iter().copied().collect::<Vec<_>>())
        };

        self.memberships
            .entry(connection)
            .or_default()
            .insert(room.clone());

        debug!(
            "Connection {} in room '{}' ({} members, new: {})",
            connection,
            room,
            members.len(),
            newly_joined
        );

        JoinOutcome {
            newly_joined,
            members,
        }
    }

    /// Removes the connection from every room it joined and returns those rooms.
    pub fn leave(&self, connection: &ConnectionId) -> Vec<RoomKey> {
        let Some((_, rooms)) = self.memberships.remove(connection) else {
            return Vec::new();
        };

        for room in &rooms {
            if let Some(mut members) = self.rooms.get_mut(room) {
                members.remove(connection);
            }

            // A concurrent join may have refilled the room in between.
            if self
                .rooms
                .remove_if(room, |_, members| members.is_empty())
                .is_some()
            {
                info!("Room '{}' is empty, dropping it", room);
            }
        }

        rooms.into_iter().collect()
    }

    pub fn members_of(&self, room: &RoomKey) -> HashSet<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, connection: &ConnectionId) -> Vec<RoomKey> {
        self.memberships
            .get(connection)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
