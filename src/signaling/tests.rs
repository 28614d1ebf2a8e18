//! Session state machine tests driven by the mock transport and peer network

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::{Direction, SdpType, SessionDescription, SignalClient, SignalEvent, SignalTransport};
use crate::errors::SignalError;
use crate::testing::{MockDataChannel, MockRtcNetwork, MockSignalTransport, TestFixtures};

const ORIGIN: &str = "https://auth.example.com";

fn client_with(
    transport: &Arc<MockSignalTransport>,
    network: &MockRtcNetwork,
) -> Arc<SignalClient> {
    let transport: Arc<dyn SignalTransport> = transport.clone();
    Arc::new(SignalClient::new(ORIGIN, transport, Arc::new(network.clone())))
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not met in time");
}

#[tokio::test]
async fn test_link_resolves_and_authenticates() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);
    let mut events = client.subscribe();

    let request_id = SignalClient::generate_request_id();
    transport.set_ack("link", TestFixtures::link_ack(&request_id));

    let message = client.link(&request_id).await.unwrap();
    assert_eq!(message, TestFixtures::link_message(&request_id));
    assert!(client.is_authenticated().await);

    // The link request carried the request id.
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "link");
    assert_eq!(requests[0].1, json!({ "requestId": request_id }));

    // Observers saw the handshake start and resolve.
    assert!(matches!(events.try_recv(), Ok(SignalEvent::Link { .. })));
    assert!(matches!(events.try_recv(), Ok(SignalEvent::LinkMessage(m)) if m == message));

    // The request id is cleared, so a new session may start.
    let next_id = SignalClient::generate_request_id();
    transport.set_ack("link", TestFixtures::link_ack(&next_id));
    client.link(&next_id).await.unwrap();
}

#[tokio::test]
async fn test_link_rejects_second_session_before_transport_interaction() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    // First link never gets acknowledged, so the session stays pending.
    let pending = client.clone();
    let request_id = SignalClient::generate_request_id();
    let first = request_id.clone();
    tokio::spawn(async move {
        let _ = pending.link(&first).await;
    });
    wait_until(|| !transport.requests().is_empty()).await;

    let before = (transport.requests().len(), transport.emitted().len());
    assert!(matches!(
        client.link("another-id").await,
        Err(SignalError::RequestInProcess)
    ));
    assert!(matches!(
        client.peer(Some("another-id"), Direction::Offer).await,
        Err(SignalError::RequestInProcess)
    ));
    // Neither rejected call touched the transport.
    assert_eq!(
        (transport.requests().len(), transport.emitted().len()),
        before
    );
}

#[tokio::test]
async fn test_signal_requires_authentication() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    assert!(matches!(
        client.signal(SdpType::Offer).await,
        Err(SignalError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_signal_resolves_first_description() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    let request_id = SignalClient::generate_request_id();
    transport.set_ack("link", TestFixtures::link_ack(&request_id));
    client.link(&request_id).await.unwrap();

    transport.deliver("offer-description", Value::String("offer-sdp-fixture".to_string()));
    // A second, late description of the same type is never observed.
    transport.deliver("offer-description", Value::String("late-sdp".to_string()));

    let description = client.signal(SdpType::Offer).await.unwrap();
    assert_eq!(
        description,
        SessionDescription {
            sdp_type: SdpType::Offer,
            sdp: "offer-sdp-fixture".to_string(),
        }
    );
}

#[tokio::test]
async fn test_peer_requires_request_id() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    assert!(matches!(
        client.peer(None, Direction::Answer).await,
        Err(SignalError::RequestIsMissing)
    ));
}

#[tokio::test]
async fn test_peer_answer_requires_authentication() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    let request_id = SignalClient::generate_request_id();
    let result = client.peer(Some(&request_id), Direction::Answer).await;
    assert!(matches!(result, Err(SignalError::Unauthenticated)));

    // The failed session resets, so a new one may start.
    transport.set_ack("link", TestFixtures::link_ack(&request_id));
    client.link(&request_id).await.unwrap();
}

#[tokio::test]
async fn test_peer_offer_applies_buffered_candidates_after_remote_description() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    let request_id = SignalClient::generate_request_id();
    transport.set_ack("link", TestFixtures::link_ack(&request_id));

    // Remote candidates arrive before the remote description is known.
    transport.deliver("offer-candidate", json!({ "candidate": "remote-1" }));
    transport.deliver("offer-candidate", json!({ "candidate": "remote-2" }));
    transport.deliver(
        "offer-description",
        Value::String("offer-sdp-fixture".to_string()),
    );

    let session = client.clone();
    let id = request_id.clone();
    let result =
        tokio::spawn(async move { session.peer(Some(&id), Direction::Offer).await });

    // The answer goes out only after the offer was applied and answered.
    transport.wait_for_emitted("answer-description").await;
    wait_until(|| network.connection_count() == 1).await;
    let connection = network.connection(0);

    // Candidates were applied in arrival order, strictly after the remote
    // description was set.
    wait_until(|| {
        connection
            .operations()
            .iter()
            .filter(|op| op.starts_with("add_candidate:remote"))
            .count()
            == 2
    })
    .await;
    let operations = connection.operations();
    let set_remote = operations
        .iter()
        .position(|op| op == "set_remote:offer")
        .unwrap();
    let first = operations
        .iter()
        .position(|op| op == "add_candidate:remote-1")
        .unwrap();
    let second = operations
        .iter()
        .position(|op| op == "add_candidate:remote-2")
        .unwrap();
    assert!(set_remote < first);
    assert!(first < second);

    // The session resolves with the channel the remote side opened.
    let (_, remote_end) = MockDataChannel::pair("liquid");
    connection.surface_remote_channel(remote_end);
    let channel = result.await.unwrap().unwrap();
    assert_eq!(channel.label(), "liquid");

    // Local candidates were forwarded under the local (answerer) role.
    wait_until(|| {
        transport
            .emitted()
            .iter()
            .any(|(event, _)| event == "answer-candidate")
    })
    .await;
}

#[tokio::test]
async fn test_peer_answer_creates_channel_and_applies_buffered_candidates() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    let request_id = SignalClient::generate_request_id();
    transport.set_ack("link", TestFixtures::link_ack(&request_id));
    client.link(&request_id).await.unwrap();

    let session = client.clone();
    let id = request_id.clone();
    let result =
        tokio::spawn(async move { session.peer(Some(&id), Direction::Answer).await });

    // The local offer goes out under the local (offerer) role.
    transport.wait_for_emitted("offer-description").await;
    let connection = network.connection(0);

    // A candidate ahead of the remote answer is buffered, not applied.
    transport.deliver("answer-candidate", json!({ "candidate": "remote-1" }));
    assert!(!connection
        .operations()
        .iter()
        .any(|op| op.starts_with("add_candidate:remote")));

    transport.deliver(
        "answer-description",
        Value::String("answer-sdp-fixture".to_string()),
    );
    let channel = result.await.unwrap().unwrap();
    assert_eq!(channel.label(), "liquid");

    wait_until(|| {
        connection
            .operations()
            .iter()
            .any(|op| op == "add_candidate:remote-1")
    })
    .await;

    // A candidate after the flush is applied directly.
    transport.deliver("answer-candidate", json!({ "candidate": "remote-2" }));
    wait_until(|| {
        connection
            .operations()
            .iter()
            .any(|op| op == "add_candidate:remote-2")
    })
    .await;

    let operations = connection.operations();
    let channel_op = operations
        .iter()
        .position(|op| op == "create_data_channel:liquid")
        .unwrap();
    let offer_op = operations.iter().position(|op| op == "create_offer").unwrap();
    let remote_op = operations
        .iter()
        .position(|op| op == "set_remote:answer")
        .unwrap();
    assert!(channel_op < offer_op);
    assert!(offer_op < remote_op);
}

#[tokio::test]
async fn test_close_resets_session_and_is_idempotent() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    let request_id = SignalClient::generate_request_id();
    transport.set_ack("link", TestFixtures::link_ack(&request_id));
    client.link(&request_id).await.unwrap();
    assert!(client.is_authenticated().await);

    client.close(true).await;
    assert!(!client.is_authenticated().await);
    assert!(!transport.is_connected());
    assert!(matches!(
        client.qr_code_data().await,
        Err(SignalError::RequestIsMissing)
    ));

    // Closing again is a no-op, and a closed client may start over.
    client.close(false).await;
    transport.set_ack("link", TestFixtures::link_ack(&request_id));
    client.link(&request_id).await.unwrap();
}

#[tokio::test]
async fn test_qr_code_data_uses_pending_request() {
    let transport = MockSignalTransport::new();
    let network = MockRtcNetwork::new();
    let client = client_with(&transport, &network);

    assert!(matches!(
        client.qr_code_data().await,
        Err(SignalError::RequestIsMissing)
    ));

    // While a link is pending the QR payload is the deep link for its id.
    let pending = client.clone();
    tokio::spawn(async move {
        let _ = pending.link("0191-fixture").await;
    });
    wait_until(|| !transport.requests().is_empty()).await;

    assert_eq!(
        client.qr_code_data().await.unwrap(),
        "liquid://auth.example.com/?requestId=0191-fixture"
    );
    assert_eq!(
        client.deep_link(Some("explicit-id")).await.unwrap(),
        "liquid://auth.example.com/?requestId=explicit-id"
    );
}

#[tokio::test]
async fn test_end_to_end_link() {
    let (transport_a, transport_b) = MockSignalTransport::pair();
    let network = MockRtcNetwork::new();
    let client_a = client_with(&transport_a, &network);
    let client_b = client_with(&transport_b, &network);

    let request_id = SignalClient::generate_request_id();
    transport_a.set_ack("link", TestFixtures::link_ack(&request_id));
    transport_b.set_ack("link", TestFixtures::link_ack(&request_id));

    // A authenticates up front and will play the offerer role.
    client_a.link(&request_id).await.unwrap();

    // B waits for the offer; its connection is created first.
    let session_b = client_b.clone();
    let id_b = request_id.clone();
    let b_task =
        tokio::spawn(async move { session_b.peer(Some(&id_b), Direction::Offer).await });
    {
        let transport_b = transport_b.clone();
        wait_until(move || !transport_b.requests().is_empty()).await;
    }

    // A opens the channel and emits the offer.
    let channel_a = client_a
        .peer(Some(&request_id), Direction::Answer)
        .await
        .unwrap();
    let channel_b = b_task.await.unwrap().unwrap();

    assert_eq!(channel_a.label(), "liquid");
    assert_eq!(channel_b.label(), "liquid");

    // The negotiated channel moves data both ways.
    channel_a.send(b"ping from a").await.unwrap();
    assert_eq!(channel_b.recv().await.unwrap(), b"ping from a");
    channel_b.send(b"pong from b").await.unwrap();
    assert_eq!(channel_a.recv().await.unwrap(), b"pong from b");

    // Each side applied the other's candidates after its remote description.
    for index in [0, 1] {
        let connection = network.connection(index);
        wait_until(|| {
            connection
                .operations()
                .iter()
                .any(|op| op.starts_with("add_candidate:"))
        })
        .await;
        let operations = connection.operations();
        let set_remote = operations
            .iter()
            .position(|op| op.starts_with("set_remote:"))
            .unwrap();
        let first_candidate = operations
            .iter()
            .position(|op| op.starts_with("add_candidate:"))
            .unwrap();
        assert!(set_remote < first_candidate, "connection {index}");
    }
}
