pub mod controller_tests;

use huddle_client::{NegotiatorEvent, NegotiatorEvents, PeerSession, SessionId};
use huddle_server::SignalingRelay;
use tokio::sync::mpsc;
use tracing::Level;

use crate::utils::MockNegotiatorFactory;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_relay() -> SignalingRelay {
    init_tracing();
    SignalingRelay::new()
}

/// A session over a mock negotiator, plus the receiver of its callbacks.
pub fn mock_session(
    factory: &MockNegotiatorFactory,
    id: u64,
) -> (PeerSession, mpsc::UnboundedReceiver<(SessionId, NegotiatorEvent)>) {
    init_tracing();
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = SessionId(id);
    let negotiator = factory.negotiator(NegotiatorEvents::new(session_id, tx));
    (PeerSession::new(session_id, negotiator), rx)
}
