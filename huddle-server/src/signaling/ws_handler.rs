use crate::signaling::SignalingRelay;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use huddle_core::ClientMessage;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(relay): State<SignalingRelay>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: SignalingRelay) {
    let (connection_id, mut rx) = relay.connect();
    info!("New WebSocket connection: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {}: {}", msg.event_name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let relay = relay.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(signal) => relay.handle(connection_id, signal),
                        Err(e) => warn!("Invalid frame from {}: {}", connection_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    // Wait for the aborted half too, so no frame is still being handled
    // when the connection is purged.
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            let _ = send_task.await;
        }
    };

    relay.disconnect(&connection_id);
    info!("WebSocket disconnected: {}", connection_id);
}
