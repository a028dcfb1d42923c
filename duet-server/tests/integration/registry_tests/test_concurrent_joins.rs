use duet_core::ConnectionId;

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_joins_are_serialized() {
    init_tracing();

    for _ in 0..20 {
        let (rooms, signaling) = create_test_registry();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        let (ra, rb) = tokio::join!(
            rooms.join(a, "a@x.com".into(), "race".into()),
            rooms.join(b, "b@x.com".into(), "race".into()),
        );
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        // Exactly one of them saw the other, and exactly one user:joined went out.
        assert_eq!(ra.peers.len() + rb.peers.len(), 1);
        assert_eq!(signaling.count_kind("user:joined").await, 1);
        assert_eq!(rooms.members(&"race".into()).await.len(), 2);
        assert_eq!(rooms.room_count(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_racing_dissolution_lands_in_live_room() {
    init_tracing();

    let (rooms, _signaling) = create_test_registry();

    for i in 0..50 {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        rooms.join(a, "a@x.com".into(), "churn".into()).await.unwrap();

        let leaver = rooms.clone();
        let (_, joined) = tokio::join!(
            async move { leaver.leave(&a).await },
            rooms.join(b, "b@x.com".into(), "churn".into()),
        );
        joined.unwrap_or_else(|e| panic!("iteration {}: {}", i, e));

        let members = rooms.members(&"churn".into()).await;
        assert!(members.iter().any(|m| m.connection == b));
        rooms.leave(&b).await;
    }
}
