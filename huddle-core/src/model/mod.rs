mod connection;
mod room;
mod session;
mod signaling;

pub use connection::ConnectionId;
pub use room::RoomKey;
pub use session::{Payload, SdpType, SessionDescription};
pub use signaling::{ClientMessage, IceServerConfig, ServerMessage};
