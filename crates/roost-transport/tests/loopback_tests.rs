//! Loopback tests: routed listener + request client over 127.0.0.1.

use std::time::Duration;

use roost_protocol::MemberId;
use roost_transport::{RequestClient, RoutedListener, TransportError};

#[tokio::test]
async fn test_routed_round_trip() {
    let mut listener = RoutedListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().to_string();

    let mut client = RequestClient::connect(&addr, MemberId::new("D1")).await.unwrap();
    client
        .send(&serde_json::json!({"msg_type": "register", "id": "D1"}))
        .await
        .unwrap();

    let (from, payload) = listener.poll(Duration::from_secs(2)).await.expect("inbound frame");
    assert_eq!(from, MemberId::new("D1"));
    assert_eq!(payload["msg_type"], "register");

    listener.send_to(&from, &serde_json::json!({"reply": "registered"})).unwrap();
    let reply = client.recv(Duration::from_secs(2)).await.unwrap().expect("reply frame");
    assert_eq!(reply["reply"], "registered");
}

#[tokio::test]
async fn test_poll_timeout_yields_none() {
    let mut listener = RoutedListener::bind("127.0.0.1:0").await.unwrap();
    let got = listener.poll(Duration::from_millis(50)).await;
    assert!(got.is_none(), "poll with no traffic must time out, not block");
}

#[tokio::test]
async fn test_send_to_unknown_peer_errors() {
    let listener = RoutedListener::bind("127.0.0.1:0").await.unwrap();
    let err = listener
        .send_to(&MemberId::new("GHOST"), &serde_json::json!({"reply": "pong"}))
        .unwrap_err();
    assert!(matches!(err, TransportError::UnknownPeer(_)));
}

#[tokio::test]
async fn test_replies_route_to_the_right_client() {
    let mut listener = RoutedListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().to_string();

    let mut a = RequestClient::connect(&addr, MemberId::new("A")).await.unwrap();
    let mut b = RequestClient::connect(&addr, MemberId::new("B")).await.unwrap();
    a.send(&serde_json::json!({"msg_type": "ping", "id": "A"})).await.unwrap();
    b.send(&serde_json::json!({"msg_type": "ping", "id": "B"})).await.unwrap();

    for _ in 0..2 {
        let (from, _) = listener.poll(Duration::from_secs(2)).await.expect("inbound frame");
        // Reply out of order relative to arrival: echo the identity back.
        listener
            .send_to(&from, &serde_json::json!({"reply": "pong", "who": from.as_str()}))
            .unwrap();
    }

    let ra = a.recv(Duration::from_secs(2)).await.unwrap().expect("reply for A");
    let rb = b.recv(Duration::from_secs(2)).await.unwrap().expect("reply for B");
    assert_eq!(ra["who"], "A");
    assert_eq!(rb["who"], "B");
}

#[tokio::test]
async fn test_client_timeout_then_late_reply_is_received() {
    let mut listener = RoutedListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().to_string();

    let mut client = RequestClient::connect(&addr, MemberId::new("D1")).await.unwrap();
    client.send(&serde_json::json!({"msg_type": "register", "id": "D1"})).await.unwrap();

    // No reply yet: bounded wait returns None instead of blocking forever.
    assert!(client.recv(Duration::from_millis(50)).await.unwrap().is_none());

    let (from, _) = listener.poll(Duration::from_secs(2)).await.expect("inbound frame");
    listener.send_to(&from, &serde_json::json!({"reply": "registered"})).unwrap();

    // Waiting again picks up the late reply without resending.
    let reply = client.recv(Duration::from_secs(2)).await.unwrap().expect("late reply");
    assert_eq!(reply["reply"], "registered");
}
