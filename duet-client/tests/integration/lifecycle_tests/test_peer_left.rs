use duet_client::{EngineEvent, Surface, TransportEvent, TransportNotification};
use duet_core::ServerEvent;

use crate::integration::init_tracing;
use crate::utils::Harness;

#[tokio::test]
async fn test_peer_left_discards_connected_session() {
    init_tracing();

    let mut h = Harness::new();
    h.establish().await;

    let a = h.a.id;
    let transport = h.b.transport_to(&a);
    let stale_epoch = h.b.engine.session(&a).unwrap().epoch();
    h.b.drain_events();

    h.b.engine
        .handle_signal(ServerEvent::UserLeft {
            email: "a@x.com".into(),
            id: a,
        })
        .await
        .unwrap();

    assert_eq!(h.b.engine.state_of(&a), None);
    assert!(transport.is_closed());
    assert!(h.b.sink.was_cleared(&Surface::Remote(a)));
    assert!(h.b.engine.counterpart().is_none());

    let events = h.b.drain_events();
    assert!(events.iter().any(|e| matches!(e, EngineEvent::SessionClosed(p) if *p == a)));
    assert!(events.iter().any(|e| matches!(e, EngineEvent::PeerLeft { peer, .. } if *peer == a)));

    // Late notifications from the dead transport change nothing.
    h.b.engine
        .handle_transport_event(TransportNotification {
            peer: a,
            epoch: stale_epoch,
            event: TransportEvent::NegotiationNeeded,
        })
        .await
        .unwrap();
    h.b.engine.drain_transport_events().await;
    assert_eq!(h.b.engine.session_count(), 0);
    assert!(h.b.drain_outbound().is_empty());
}

#[tokio::test]
async fn test_call_failed_discards_session() {
    init_tracing();

    let mut h = Harness::new();
    h.introduce().await;
    h.a.engine.call_user().await.unwrap();

    let b = h.b.id;
    h.a.engine
        .handle_signal(ServerEvent::CallFailed {
            peer: b,
            reason: "peer left".into(),
        })
        .await
        .unwrap();

    assert_eq!(h.a.engine.state_of(&b), None);
    assert!(h.a.transport_to(&b).is_closed());
    assert!(h.a.drain_events().iter().any(|e| matches!(
        e,
        EngineEvent::CallFailed { peer, .. } if *peer == b
    )));
}

#[tokio::test]
async fn test_new_call_after_peer_returns() {
    init_tracing();

    let mut h = Harness::new();
    h.establish().await;

    let (a, b) = (h.a.id, h.b.id);
    h.a.engine
        .handle_signal(ServerEvent::UserLeft {
            email: "b@x.com".into(),
            id: b,
        })
        .await
        .unwrap();
    h.b.engine
        .handle_signal(ServerEvent::UserLeft {
            email: "a@x.com".into(),
            id: a,
        })
        .await
        .unwrap();
    h.pump().await;

    h.establish().await;

    assert_eq!(h.a.transports.opened_count(), 2);
    assert_eq!(
        h.a.engine.session(&b).unwrap().remote_media().len(),
        2
    );
    assert!(h.a.errors.is_empty() && h.b.errors.is_empty());
}
