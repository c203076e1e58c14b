use crate::error::SignalingError;
use crate::signaling::signaling_output::SignalingOutput;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// WebSocket connection to the relay.
///
/// Inbound frames come out of the receiver returned by [`WsSignaling::connect`];
/// it closes when the socket does.
pub struct WsSignaling {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    tasks: Vec<JoinHandle<()>>,
}

impl WsSignaling {
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerMessage>), SignalingError> {
        let (ws_stream, _) = connect_async(url).await?;
        info!("Signaling connected to {}", url);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel::<ServerMessage>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", msg.event_name(), e);
                        continue;
                    }
                };
                if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                    warn!("Signaling send failed: {}", e);
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            if inbound_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Ignoring unreadable relay frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Signaling socket closed: {}", e);
                        break;
                    }
                }
            }
            info!("Signaling connection ended");
        });

        Ok((
            Self {
                outbound,
                tasks: vec![writer, reader],
            },
            inbound,
        ))
    }
}

#[async_trait]
impl SignalingOutput for WsSignaling {
    async fn send(&self, msg: ClientMessage) -> Result<(), SignalingError> {
        self.outbound.send(msg).map_err(|_| SignalingError::Closed)
    }
}

impl Drop for WsSignaling {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
