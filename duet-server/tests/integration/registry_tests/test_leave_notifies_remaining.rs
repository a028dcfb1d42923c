use duet_core::{ConnectionId, ServerEvent};

use crate::integration::{create_test_registry, init_tracing};
use crate::utils::{SIGNAL_TIMEOUT_MS, wait_until};

#[tokio::test]
async fn test_leave_notifies_remaining() {
    init_tracing();

    let (rooms, signaling) = create_test_registry();
    let a = ConnectionId::new();
    let b = ConnectionId::new();

    rooms.join(a, "a@x.com".into(), "abc123".into()).await.unwrap();
    rooms.join(b, "b@x.com".into(), "abc123".into()).await.unwrap();

    let left = rooms.leave(&b).await.expect("B was in a room");
    assert_eq!(left.member.connection, b);
    assert_eq!(left.remaining.len(), 1);
    assert_eq!(rooms.room_of(&b), None);

    let last = signaling.events_for(&a).await.pop();
    assert_eq!(
        last,
        Some(ServerEvent::UserLeft {
            email: "b@x.com".into(),
            id: b,
        })
    );
}

#[tokio::test]
async fn test_leave_is_idempotent() {
    init_tracing();

    let (rooms, _signaling) = create_test_registry();
    let a = ConnectionId::new();

    assert!(rooms.leave(&a).await.is_none());

    rooms.join(a, "a@x.com".into(), "r".into()).await.unwrap();
    assert!(rooms.leave(&a).await.is_some());
    assert!(rooms.leave(&a).await.is_none());
}

#[tokio::test]
async fn test_empty_room_dissolves_and_can_be_recreated() {
    init_tracing();

    let (rooms, signaling) = create_test_registry();
    let a = ConnectionId::new();
    let b = ConnectionId::new();

    rooms.join(a, "a@x.com".into(), "r".into()).await.unwrap();
    rooms.leave(&a).await;

    let dissolved = wait_until(SIGNAL_TIMEOUT_MS, || async { rooms.room_count() == 0 }).await;
    assert!(dissolved, "empty room should unregister itself");

    let result = rooms.join(b, "b@x.com".into(), "r".into()).await.unwrap();
    assert!(result.peers.is_empty());
    assert_eq!(signaling.count_kind("user:joined").await, 0);
}
