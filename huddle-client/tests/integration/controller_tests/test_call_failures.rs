use huddle_client::{CallConfig, CallError, CallEvent, CallPhase, MediaError, NegotiatorEvent};
use huddle_core::ClientMessage;

use crate::integration::controller_tests::test_loopback_call::establish_call;
use crate::integration::create_test_relay;
use crate::utils::{
    MockMediaSource, MockNegotiatorFactory, TestClient, offer_payload, wait_for_event,
};

#[tokio::test]
async fn test_media_failure_fails_the_call() {
    let relay = create_test_relay();
    let mut a = TestClient::connect_with(
        &relay,
        CallConfig::default(),
        MockNegotiatorFactory::new(),
        MockMediaSource::denied(),
    )
    .await;
    let (b, _b_rx) = relay.connect();

    a.handle.call_participant(b).unwrap();

    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, Some(b));
            assert!(matches!(error, CallError::Media(_)), "got {:?}", error);
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }

    assert_eq!(a.probe.counts().created, 0);
    let snap = a.handle.snapshot().await.unwrap();
    assert_eq!(snap.phase, CallPhase::Idle);
}

#[tokio::test]
async fn test_call_without_participant_fails() {
    let relay = create_test_relay();
    let mut a = TestClient::connect(&relay).await;
    a.join("r1", "ana@example.com").await;

    a.handle.call().unwrap();

    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, None);
            assert!(matches!(error, CallError::NoParticipant));
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }
    assert_eq!(a.media.acquired(), 0);
}

#[tokio::test]
async fn test_negotiator_setup_failure_releases_media() {
    let relay = create_test_relay();
    let factory = MockNegotiatorFactory {
        fail: true,
        ..Default::default()
    };
    let mut a =
        TestClient::connect_with(&relay, CallConfig::default(), factory, MockMediaSource::new(2))
            .await;
    let (b, _b_rx) = relay.connect();

    a.handle.call_participant(b).unwrap();

    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { error, .. } => {
            assert!(matches!(error, CallError::Setup(_)), "got {:?}", error)
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }
    assert_eq!(a.media.acquired(), 1);
    assert_eq!(a.media.released(), 1);
}

#[tokio::test]
async fn test_malformed_answer_aborts_the_call() {
    let relay = create_test_relay();
    let mut a = TestClient::connect(&relay).await;
    let (b, mut b_rx) = relay.connect();
    let _welcome = b_rx.recv().await;

    a.handle.call_participant(b).unwrap();
    let _incoming = b_rx.recv().await;

    // An offer where the answer belongs.
    relay.handle(
        b,
        ClientMessage::CallAccepted {
            to: a.id,
            ans: offer_payload("not-an-answer"),
        },
    );

    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, Some(b));
            match error {
                CallError::Negotiation(e) => assert!(e.is_malformed()),
                other => panic!("Expected a negotiation error, got {:?}", other),
            }
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }

    assert_eq!(a.media.released(), 1);
    assert_eq!(a.probe.counts().closes, 1);
    assert_eq!(a.handle.snapshot().await.unwrap().phase, CallPhase::Idle);
}

#[tokio::test]
async fn test_garbage_payload_aborts_the_call() {
    let relay = create_test_relay();
    let mut a = TestClient::connect(&relay).await;
    let (b, _b_rx) = relay.connect();

    relay.handle(
        b,
        ClientMessage::CallUser {
            to: a.id,
            offer: serde_json::json!({ "sdp": 42 }).into(),
        },
    );

    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { error, .. } => {
            assert!(matches!(error, CallError::Payload(_)), "got {:?}", error)
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }
    assert_eq!(a.media.released(), 1);
}

#[tokio::test]
async fn test_transport_failure_ends_the_call() {
    let relay = create_test_relay();
    let mut a = TestClient::connect(&relay).await;
    let mut b = TestClient::connect(&relay).await;
    establish_call(&mut a, &mut b).await;

    a.probe
        .last_sink()
        .unwrap()
        .emit(NegotiatorEvent::TransportFailed);

    let b_id = b.id;
    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, Some(b_id));
            assert!(matches!(error, CallError::TransportFailed));
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }
    assert_eq!(a.media.released(), 1);

    // Callbacks from the torn-down session change nothing.
    let stale = a.probe.last_sink().unwrap();
    stale.emit(NegotiatorEvent::TransportFailed);
    stale.emit(NegotiatorEvent::NegotiationNeeded);
    let snap = a.handle.snapshot().await.unwrap();
    assert_eq!(snap.phase, CallPhase::Idle);
    assert_eq!(a.media.released(), 1);
}

#[tokio::test]
async fn test_second_call_is_busy() {
    let relay = create_test_relay();
    let mut a = TestClient::connect(&relay).await;
    let mut b = TestClient::connect(&relay).await;
    establish_call(&mut a, &mut b).await;

    a.handle.call().unwrap();

    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { error, .. } => assert!(matches!(error, CallError::Busy)),
        other => panic!("Expected CallFailed, got {:?}", other),
    }
    // The running call is untouched.
    assert_eq!(a.handle.snapshot().await.unwrap().phase, CallPhase::InCall);
    assert_eq!(a.media.acquired(), 1);
}

#[tokio::test]
async fn test_caller_without_tracks_is_refused() {
    let relay = create_test_relay();
    let mut a = TestClient::connect_with(
        &relay,
        CallConfig::default(),
        MockNegotiatorFactory::new(),
        MockMediaSource::new(0),
    )
    .await;
    let (b, mut b_rx) = relay.connect();
    let _welcome = b_rx.recv().await;

    a.handle.call_participant(b).unwrap();

    match wait_for_event(&mut a.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, Some(b));
            assert!(
                matches!(error, CallError::Media(MediaError::Unavailable)),
                "got {:?}",
                error
            );
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }

    // Nothing went out that would leave the callee with one-way media.
    assert_eq!(a.probe.counts().created, 0);
    assert!(b_rx.try_recv().is_err());
    let snap = a.handle.snapshot().await.unwrap();
    assert_eq!(snap.phase, CallPhase::Idle);
}

#[tokio::test]
async fn test_callee_without_tracks_names_the_caller() {
    let relay = create_test_relay();
    let mut b = TestClient::connect_with(
        &relay,
        CallConfig::default(),
        MockNegotiatorFactory::new(),
        MockMediaSource::new(0),
    )
    .await;
    let (caller, _caller_rx) = relay.connect();

    relay.handle(
        caller,
        ClientMessage::CallUser {
            to: b.id,
            offer: offer_payload("no-media-here"),
        },
    );

    match wait_for_event(&mut b.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, Some(caller));
            assert!(
                matches!(error, CallError::Media(MediaError::Unavailable)),
                "got {:?}",
                error
            );
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }
    assert_eq!(b.probe.counts().created, 0);
}

#[tokio::test]
async fn test_denied_media_on_incoming_call_names_the_caller() {
    let relay = create_test_relay();
    let mut b = TestClient::connect_with(
        &relay,
        CallConfig::default(),
        MockNegotiatorFactory::new(),
        MockMediaSource::denied(),
    )
    .await;
    let (caller, mut caller_rx) = relay.connect();
    let _welcome = caller_rx.recv().await;

    relay.handle(
        caller,
        ClientMessage::CallUser {
            to: b.id,
            offer: offer_payload("camera-blocked"),
        },
    );

    match wait_for_event(&mut b.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, Some(caller));
            assert!(matches!(error, CallError::Media(MediaError::Denied(_))), "got {:?}", error);
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }

    let snap = b.handle.snapshot().await.unwrap();
    assert_eq!(snap.phase, CallPhase::Idle);
    assert!(caller_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_setup_failure_on_incoming_call_names_the_caller() {
    let relay = create_test_relay();
    let factory = MockNegotiatorFactory {
        fail: true,
        ..Default::default()
    };
    let mut b =
        TestClient::connect_with(&relay, CallConfig::default(), factory, MockMediaSource::new(2))
            .await;
    let (caller, _caller_rx) = relay.connect();

    relay.handle(
        caller,
        ClientMessage::CallUser {
            to: b.id,
            offer: offer_payload("no-backend"),
        },
    );

    match wait_for_event(&mut b.events, |e| matches!(e, CallEvent::CallFailed { .. })).await {
        CallEvent::CallFailed { peer, error } => {
            assert_eq!(peer, Some(caller));
            assert!(matches!(error, CallError::Setup(_)), "got {:?}", error);
        }
        other => panic!("Expected CallFailed, got {:?}", other),
    }
    assert_eq!(b.media.acquired(), 1);
    assert_eq!(b.media.released(), 1);
}
