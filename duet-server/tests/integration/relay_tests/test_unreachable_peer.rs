use duet_core::{ClientEvent, ConnectionId, ServerEvent, SessionDescription, SignalingError};

use crate::integration::{create_test_relay, init_tracing};

#[tokio::test]
async fn test_unreachable_peer_reports_call_failed() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = ConnectionId::new();
    let gone = ConnectionId::new();
    signaling.disconnect(gone).await;

    let relayed = ClientEvent::CallAccepted {
        to: gone,
        ans: SessionDescription::answer("v=0"),
    }
    .into_relayed(a)
    .unwrap();

    let err = relay.dispatch(a, relayed).await.unwrap_err();
    assert_eq!(err, SignalingError::PeerUnreachable(gone));

    match signaling.events_for(&a).await.as_slice() {
        [ServerEvent::CallFailed { peer, .. }] => assert_eq!(*peer, gone),
        other => panic!("expected a single call:failed, got {:?}", other),
    }
}
