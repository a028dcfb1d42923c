use duet_client::{NegotiationState, TransportEvent, TransportNotification};

use crate::integration::init_tracing;
use crate::utils::Harness;

#[tokio::test]
async fn test_negotiation_needed_while_renegotiating_is_replayed() {
    init_tracing();

    let mut h = Harness::new();
    h.establish().await;

    let (a, b) = (h.a.id, h.b.id);
    let epoch = h.a.engine.session(&b).unwrap().epoch();
    let needed = || TransportNotification {
        peer: b,
        epoch,
        event: TransportEvent::NegotiationNeeded,
    };

    h.a.engine.handle_transport_event(needed()).await.unwrap();
    assert_eq!(
        h.a.engine.state_of(&b),
        Some(NegotiationState::Renegotiating)
    );

    // Second request while the first round is in flight gets parked.
    h.a.engine.handle_transport_event(needed()).await.unwrap();
    assert!(h.a.engine.session(&b).unwrap().is_renegotiation_pending());

    h.pump().await;

    assert_eq!(h.count(a, "peer:nego:needed"), 3);
    assert_eq!(h.count(b, "peer:nego:done"), 3);
    let session = h.a.engine.session(&b).unwrap();
    assert_eq!(session.state(), NegotiationState::Connected);
    assert!(!session.is_renegotiation_pending());
    assert!(h.a.errors.is_empty() && h.b.errors.is_empty());
}

#[tokio::test]
async fn test_negotiation_needed_before_connected_waits() {
    init_tracing();

    let mut h = Harness::new();
    h.introduce().await;
    h.a.engine.call_user().await.unwrap();

    let b = h.b.id;
    let epoch = h.a.engine.session(&b).unwrap().epoch();
    h.a.engine
        .handle_transport_event(TransportNotification {
            peer: b,
            epoch,
            event: TransportEvent::NegotiationNeeded,
        })
        .await
        .unwrap();

    // Still Offering: nothing sent yet, request parked.
    assert_eq!(h.a.engine.state_of(&b), Some(NegotiationState::Offering));
    assert!(h.a.engine.session(&b).unwrap().is_renegotiation_pending());

    h.pump().await;

    assert_eq!(h.a.engine.state_of(&b), Some(NegotiationState::Connected));
    assert!(!h.a.engine.session(&b).unwrap().is_renegotiation_pending());
    assert!(h.a.errors.is_empty() && h.b.errors.is_empty());
}
