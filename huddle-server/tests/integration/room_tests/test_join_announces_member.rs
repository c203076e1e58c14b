use huddle_core::{RoomKey, ServerMessage};

use crate::integration::create_test_relay;
use crate::utils::TestPeer;

#[tokio::test]
async fn test_join_announces_member() {
    let relay = create_test_relay();

    let mut a = TestPeer::connect(&relay);
    let mut b = TestPeer::connect(&relay);

    a.join("r1", "a");
    match a.recv().await {
        ServerMessage::RoomJoined { room_id, email } => {
            assert_eq!(room_id, RoomKey::from("r1"));
            assert_eq!(email, "a");
        }
        other => panic!("Expected room-joined, got {:?}", other),
    }
    // Nobody else in the room yet
    a.expect_silence().await;

    b.join_and_ack("r1", "b").await;

    match a.recv().await {
        ServerMessage::UserJoined { email, id } => {
            assert_eq!(email, "b");
            assert_eq!(id, b.id);
        }
        other => panic!("Expected user-joined, got {:?}", other),
    }

    // Exactly once, and the joiner is not told about itself
    a.expect_silence().await;
    b.expect_silence().await;

    let members = relay.members_of(&RoomKey::from("r1"));
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_announcement_stays_inside_room() {
    let relay = create_test_relay();

    let mut a = TestPeer::connect(&relay);
    let mut b = TestPeer::connect(&relay);

    a.join_and_ack("r1", "a").await;
    b.join_and_ack("R1", "b").await;

    a.expect_silence().await;
    b.expect_silence().await;
}
