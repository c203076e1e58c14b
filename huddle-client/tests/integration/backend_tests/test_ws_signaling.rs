use std::sync::Arc;

use anyhow::Result;
use huddle_client::{CallConfig, CallController, CallEvent, CallPhase, SignalingOutput, WsSignaling};
use huddle_core::{ClientMessage, RoomKey, ServerMessage};
use huddle_server::{SignalingRelay, serve_on};
use tokio::net::TcpListener;

use crate::integration::init_tracing;
use crate::utils::{MockMediaSource, MockNegotiatorFactory, next_event, wait_for_event, wait_for_snapshot};

async fn spawn_test_server() -> Result<String> {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = serve_on(listener, SignalingRelay::new(), "/ws").await {
            tracing::error!("[TestServer] {:?}", e);
        }
    });

    Ok(format!("ws://{}/ws", addr))
}

#[tokio::test]
async fn test_ws_signaling_round_trip() -> Result<()> {
    let url = spawn_test_server().await?;
    let (signaling, mut inbound) = WsSignaling::connect(&url).await?;

    let own = match inbound.recv().await {
        Some(ServerMessage::Welcome { id }) => id,
        other => panic!("Expected welcome, got {:?}", other),
    };

    signaling
        .send(ClientMessage::JoinRoom {
            room_id: RoomKey::from("r1"),
            email: "ana@example.com".to_owned(),
        })
        .await?;

    match inbound.recv().await {
        Some(ServerMessage::RoomJoined { room_id, email }) => {
            assert_eq!(room_id.as_str(), "r1");
            assert_eq!(email, "ana@example.com");
        }
        other => panic!("Expected room-joined for {}, got {:?}", own, other),
    }
    Ok(())
}

#[tokio::test]
async fn test_call_over_websocket() -> Result<()> {
    let url = spawn_test_server().await?;

    let mut clients = Vec::new();
    for _ in 0..2 {
        let (signaling, inbound) = WsSignaling::connect(&url).await?;
        let media = MockMediaSource::new(2);
        let (handle, mut events, _task) = CallController::spawn(
            CallConfig::default(),
            Arc::new(MockNegotiatorFactory::new()),
            media,
            Arc::new(signaling),
            inbound,
        );
        let id = match next_event(&mut events).await {
            CallEvent::Connected { id } => id,
            other => panic!("Expected Connected, got {:?}", other),
        };
        clients.push((id, handle, events));
    }
    let (b_id, b_handle, mut b_events) = clients.pop().unwrap();
    let (a_id, a_handle, mut a_events) = clients.pop().unwrap();

    a_handle.join_room("r1", "ana@example.com")?;
    wait_for_event(&mut a_events, |e| matches!(e, CallEvent::RoomJoined { .. })).await;
    b_handle.join_room("r1", "bo@example.com")?;
    wait_for_event(&mut a_events, |e| {
        matches!(e, CallEvent::ParticipantJoined(p) if p.id == b_id)
    })
    .await;

    a_handle.call()?;

    wait_for_event(&mut b_events, |e| {
        matches!(e, CallEvent::CallEstablished { peer } if *peer == a_id)
    })
    .await;
    wait_for_event(&mut a_events, |e| {
        matches!(e, CallEvent::CallEstablished { peer } if *peer == b_id)
    })
    .await;

    let snap = wait_for_snapshot(&a_handle, |s| s.local_tracks == 2).await;
    assert_eq!(snap.phase, CallPhase::InCall);
    Ok(())
}

#[tokio::test]
async fn test_connect_to_nothing_fails() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WsSignaling::connect(&format!("ws://{}/ws", addr)).await;
    assert!(result.is_err());
}
