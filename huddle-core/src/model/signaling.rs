use crate::model::connection::ConnectionId;
use crate::model::room::RoomKey;
use crate::model::session::Payload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: RoomKey,
        email: String,
    },
    CallUser {
        to: ConnectionId,
        offer: Payload,
    },
    CallAccepted {
        to: ConnectionId,
        ans: Payload,
    },
    PeerNegoNeeded {
        to: ConnectionId,
        offer: Payload,
    },
    PeerNegoDone {
        to: ConnectionId,
        ans: Payload,
    },
}

impl ClientMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom { .. } => "join-room",
            ClientMessage::CallUser { .. } => "call-user",
            ClientMessage::CallAccepted { .. } => "call-accepted",
            ClientMessage::PeerNegoNeeded { .. } => "peer-nego-needed",
            ClientMessage::PeerNegoDone { .. } => "peer-nego-done",
        }
    }
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// First frame on every connection: the id the relay assigned to it.
    Welcome {
        id: ConnectionId,
    },
    RoomJoined {
        #[serde(rename = "roomId")]
        room_id: RoomKey,
        email: String,
    },
    UserJoined {
        email: String,
        id: ConnectionId,
    },
    IncomingCall {
        from: ConnectionId,
        offer: Payload,
    },
    CallAccepted {
        from: ConnectionId,
        ans: Payload,
    },
    PeerNegoNeeded {
        from: ConnectionId,
        offer: Payload,
    },
    PeerNegoFinal {
        from: ConnectionId,
        ans: Payload,
    },
}

impl ServerMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::RoomJoined { .. } => "room-joined",
            ServerMessage::UserJoined { .. } => "user-joined",
            ServerMessage::IncomingCall { .. } => "incoming-call",
            ServerMessage::CallAccepted { .. } => "call-accepted",
            ServerMessage::PeerNegoNeeded { .. } => "peer-nego-needed",
            ServerMessage::PeerNegoFinal { .. } => "peer-nego-final",
        }
    }
}
