use duet_client::{NegotiationState, SimulatedTransportFactory};
use duet_core::{ConnectionId, SignalingError};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{FlakyTransportFactory, Harness, Peer};

#[tokio::test]
async fn test_attaching_same_handle_twice_does_not_duplicate_tracks() {
    init_tracing();

    let mut h = Harness::new();
    h.establish().await;

    let (a, b) = (h.a.id, h.b.id);
    let before = h.count(a, "peer:nego:needed");

    h.a.engine.send_streams(b).await.unwrap();
    h.a.engine.send_streams(b).await.unwrap();
    h.b.engine.send_streams(a).await.unwrap();
    h.pump().await;

    assert_eq!(h.a.transport_to(&b).local_track_ids().len(), 2);
    assert_eq!(h.b.transport_to(&a).local_track_ids().len(), 2);
    assert_eq!(h.count(a, "peer:nego:needed"), before);
    assert_eq!(h.b.engine.session(&a).unwrap().remote_media().len(), 2);
    assert_eq!(h.b.transport_to(&a).remote_track_count(), 2);
}

#[tokio::test]
async fn test_send_streams_requires_connected_session() {
    init_tracing();

    let mut h = Harness::new();
    h.introduce().await;
    h.a.engine.call_user().await.unwrap();

    let b = h.b.id;
    let err = h.a.engine.send_streams(b).await.unwrap_err();
    assert!(matches!(err, SignalingError::InvalidSignalingState { .. }));
    assert_eq!(h.a.engine.state_of(&b), Some(NegotiationState::Offering));

    let stranger = ConnectionId::new();
    assert!(h.a.engine.send_streams(stranger).await.is_err());
    assert_eq!(h.a.engine.session_count(), 1);
}

#[tokio::test]
async fn test_send_streams_recovers_from_partial_attach() {
    init_tracing();

    let transports = SimulatedTransportFactory::new();
    let flaky = Arc::new(FlakyTransportFactory::new(transports.clone(), 2));
    let a = Peer::with_transports("a@x.com", transports, flaky);
    let mut h = Harness::with_peers(a, Peer::new("b@x.com"));
    h.establish().await;

    let (a, b) = (h.a.id, h.b.id);
    assert_eq!(
        h.a.errors,
        vec![SignalingError::Transport("transient".to_string())]
    );
    assert_eq!(h.a.engine.state_of(&b), Some(NegotiationState::Connected));
    assert_eq!(h.a.engine.session(&b).unwrap().attached_handle(), None);
    assert_eq!(h.a.transport_to(&b).local_track_ids().len(), 1);
    assert_eq!(h.b.transport_to(&a).remote_track_count(), 1);

    // The retry only adds what is missing.
    h.a.engine.send_streams(b).await.unwrap();
    h.pump().await;

    let session = h.a.engine.session(&b).unwrap();
    assert_eq!(
        session.attached_handle(),
        Some(session.local_media().id.as_str())
    );
    assert_eq!(h.a.transport_to(&b).local_track_ids().len(), 2);
    assert_eq!(h.b.transport_to(&a).remote_track_count(), 2);
    assert_eq!(h.b.engine.session(&a).unwrap().remote_media().len(), 2);

    h.a.engine.send_streams(b).await.unwrap();
    assert_eq!(h.a.transport_to(&b).local_track_ids().len(), 2);
    assert_eq!(h.a.engine.state_of(&b), Some(NegotiationState::Connected));
}
