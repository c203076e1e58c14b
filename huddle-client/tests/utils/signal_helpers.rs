use huddle_client::{CallEvent, CallHandle, CallSnapshot};
use huddle_core::{Payload, SessionDescription};
use std::time::Duration;
use tokio::sync::mpsc;

/// Timeout for a single expected event (ms).
pub const EVENT_TIMEOUT_MS: u64 = 2000;

/// How long a controller must stay quiet to count as "nothing happened" (ms).
pub const SILENCE_MS: u64 = 200;

pub fn offer_payload(tag: &str) -> Payload {
    Payload::from(&SessionDescription::offer(format!("v=0\r\ns={}\r\n", tag)))
}

pub fn answer_payload(tag: &str) -> Payload {
    Payload::from(&SessionDescription::answer(format!("v=0\r\ns={}\r\n", tag)))
}

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<CallEvent>) -> CallEvent {
    match tokio::time::timeout(Duration::from_millis(EVENT_TIMEOUT_MS), events.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => panic!("Call event stream closed"),
        Err(_) => panic!("Timeout waiting for a call event"),
    }
}

/// Skips events until one matches.
pub async fn wait_for_event(
    events: &mut mpsc::UnboundedReceiver<CallEvent>,
    mut pred: impl FnMut(&CallEvent) -> bool,
) -> CallEvent {
    loop {
        let event = next_event(events).await;
        if pred(&event) {
            return event;
        }
        tracing::debug!("[Test] skipping {:?}", event);
    }
}

/// Polls snapshots until one satisfies `pred`.
pub async fn wait_for_snapshot(
    handle: &CallHandle,
    mut pred: impl FnMut(&CallSnapshot) -> bool,
) -> CallSnapshot {
    let poll = async {
        loop {
            let snapshot = handle.snapshot().await.expect("controller is running");
            if pred(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    match tokio::time::timeout(Duration::from_millis(EVENT_TIMEOUT_MS), poll).await {
        Ok(snapshot) => snapshot,
        Err(_) => panic!("Snapshot never reached the expected state"),
    }
}

pub async fn expect_no_event(events: &mut mpsc::UnboundedReceiver<CallEvent>) {
    if let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(SILENCE_MS), events.recv()).await
    {
        panic!("Expected no call event, got {:?}", event);
    }
}
