use duet_core::{ClientEvent, ServerEvent, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{QUIET_PERIOD_MS, SIGNAL_TIMEOUT_MS, TestClient, start_server};

#[tokio::test]
async fn test_abc123_signaling_over_websocket() {
    init_tracing();

    let addr = start_server().await.expect("server should start");
    let mut a = TestClient::connect(addr, "a@x.com").await.unwrap();
    let mut b = TestClient::connect(addr, "b@x.com").await.unwrap();

    a.join("abc123").await.unwrap();
    b.join("abc123").await.unwrap();

    let b_id = match a.expect("user:joined", SIGNAL_TIMEOUT_MS).await.unwrap() {
        ServerEvent::UserJoined { email, id } => {
            assert_eq!(email.as_str(), "b@x.com");
            id
        }
        other => panic!("unexpected {:?}", other),
    };
    assert!(b.is_quiet(QUIET_PERIOD_MS).await, "joiner must not get user:joined");

    // Offer from the member already present.
    a.send(&ClientEvent::UserCall {
        to: b_id,
        offer: SessionDescription::offer("offer-1"),
    })
    .await
    .unwrap();

    let a_id = match b.expect("incoming:call", SIGNAL_TIMEOUT_MS).await.unwrap() {
        ServerEvent::IncomingCall { from, offer } => {
            assert_eq!(offer.sdp, "offer-1");
            from
        }
        other => panic!("unexpected {:?}", other),
    };

    b.send(&ClientEvent::CallAccepted {
        to: a_id,
        ans: SessionDescription::answer("answer-1"),
    })
    .await
    .unwrap();
    let accepted = a.expect("call:accepted", SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(
        accepted,
        ServerEvent::CallAccepted {
            from: b_id,
            ans: SessionDescription::answer("answer-1"),
        }
    );

    // Renegotiation round.
    a.send(&ClientEvent::NegoNeeded {
        to: b_id,
        offer: SessionDescription::offer("offer-2"),
    })
    .await
    .unwrap();
    let nego = b.expect("peer:nego:needed", SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(nego.relayed_from(), Some(a_id));

    b.send(&ClientEvent::NegoDone {
        to: a_id,
        ans: SessionDescription::answer("answer-2"),
    })
    .await
    .unwrap();
    let done = a.expect("peer:nego:final", SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(
        done,
        ServerEvent::NegoFinal {
            from: b_id,
            ans: SessionDescription::answer("answer-2"),
        }
    );

    a.close().await.unwrap();
    b.close().await.unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    init_tracing();

    let addr = start_server().await.unwrap();
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));
}
