use duet_core::{IceCandidate, ServerEvent};

use crate::integration::init_tracing;
use crate::utils::Harness;

#[tokio::test]
async fn test_candidates_are_exchanged_both_ways() {
    init_tracing();

    let mut h = Harness::new();
    h.establish().await;

    let (a, b) = (h.a.id, h.b.id);
    assert!(h.count(a, "peer:ice") >= 1);
    assert!(h.count(b, "peer:ice") >= 1);
    assert!(!h.a.transport_to(&b).candidates().is_empty());
    assert!(!h.b.transport_to(&a).candidates().is_empty());
}

#[tokio::test]
async fn test_early_candidate_is_queued_until_answer() {
    init_tracing();

    let mut h = Harness::new();
    h.introduce().await;
    h.a.engine.call_user().await.unwrap();

    let b = h.b.id;
    let early = IceCandidate::new("candidate:9 1 udp 1 10.0.0.9 9999 typ host");
    h.a.engine
        .handle_signal(ServerEvent::IceCandidate {
            from: b,
            candidate: early.clone(),
        })
        .await
        .unwrap();

    assert_eq!(h.a.engine.session(&b).unwrap().queued_candidates(), 1);
    assert!(h.a.transport_to(&b).candidates().is_empty());

    h.pump().await;

    assert_eq!(h.a.engine.session(&b).unwrap().queued_candidates(), 0);
    assert!(h.a.transport_to(&b).candidates().contains(&early));
}
