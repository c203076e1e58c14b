use crate::error::SignalingError;
use async_trait::async_trait;
use huddle_core::ClientMessage;
use tokio::sync::mpsc;

/// Outbound half of a relay connection.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send(&self, msg: ClientMessage) -> Result<(), SignalingError>;
}

#[async_trait]
impl SignalingOutput for mpsc::UnboundedSender<ClientMessage> {
    async fn send(&self, msg: ClientMessage) -> Result<(), SignalingError> {
        mpsc::UnboundedSender::send(self, msg).map_err(|_| SignalingError::Closed)
    }
}
