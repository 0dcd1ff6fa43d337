//! Integration tests for the send worker.
//!
//! Reliable connections are in-memory duplex pipes; the datagram side uses
//! real UDP sockets on loopback.

use std::sync::Arc;
use std::time::Duration;

use homestead_protocol::{ClientServerChatboxMessage, ClientServerTestUdp, Packet, PlayerId};
use homestead_transport::{
    ConnectionId, MAX_DATAGRAM_SIZE, SendTarget, TransportError, read_frame, send_channel,
};
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn chat(text: &str) -> Packet {
    ClientServerChatboxMessage {
        message: text.into(),
    }
    .into()
}

async fn loopback_udp() -> Arc<UdpSocket> {
    Arc::new(UdpSocket::bind("127.0.0.1:0").await.expect("bind udp"))
}

#[tokio::test]
async fn test_reliable_send_reaches_registered_connection() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    let (local, mut remote) = tokio::io::duplex(1024);
    let id = ConnectionId::next();
    sender.register(id, Box::new(local)).unwrap();
    sender
        .add_packet_to_send(SendTarget::Reliable(id), &chat("hello"), 0)
        .unwrap();

    let frame = timeout(Duration::from_secs(2), read_frame(&mut remote))
        .await
        .expect("frame in time")
        .unwrap()
        .unwrap();
    assert_eq!(Packet::decode(&frame).unwrap(), chat("hello"));
}

#[tokio::test]
async fn test_reliable_sends_arrive_in_order() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    let (local, mut remote) = tokio::io::duplex(4096);
    let id = ConnectionId::next();
    sender.register(id, Box::new(local)).unwrap();
    for i in 0..10 {
        sender
            .add_packet_to_send(SendTarget::Reliable(id), &chat(&i.to_string()), 0)
            .unwrap();
    }
    for i in 0..10 {
        let frame = read_frame(&mut remote).await.unwrap().unwrap();
        assert_eq!(Packet::decode(&frame).unwrap(), chat(&i.to_string()));
    }
}

#[tokio::test]
async fn test_datagram_send_reaches_address() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap();
    let test_udp: Packet = ClientServerTestUdp {
        player_id: PlayerId(5),
    }
    .into();
    sender
        .add_packet_to_send(SendTarget::Datagram(addr), &test_udp, 0)
        .unwrap();

    let mut buf = vec![0u8; 2048];
    let (n, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .expect("datagram in time")
        .unwrap();
    assert_eq!(Packet::decode(&buf[..n]).unwrap(), test_udp);
}

#[tokio::test]
async fn test_delayed_send_waits_for_delay() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    let (local, mut remote) = tokio::io::duplex(1024);
    let id = ConnectionId::next();
    sender.register(id, Box::new(local)).unwrap();
    sender
        .add_packet_to_send(SendTarget::Reliable(id), &chat("later"), 150)
        .unwrap();
    sender
        .add_packet_to_send(SendTarget::Reliable(id), &chat("now"), 0)
        .unwrap();

    let first = read_frame(&mut remote).await.unwrap().unwrap();
    assert_eq!(Packet::decode(&first).unwrap(), chat("now"));

    // Nothing else should show up well before the deadline.
    assert!(
        timeout(Duration::from_millis(30), read_frame(&mut remote))
            .await
            .is_err()
    );

    let second = timeout(Duration::from_secs(2), read_frame(&mut remote))
        .await
        .expect("delayed frame in time")
        .unwrap()
        .unwrap();
    assert_eq!(Packet::decode(&second).unwrap(), chat("later"));
}

#[tokio::test]
async fn test_reliable_write_failure_is_reported() {
    let (sender, worker, mut failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    let (local, remote) = tokio::io::duplex(64);
    drop(remote);
    let id = ConnectionId::next();
    sender.register(id, Box::new(local)).unwrap();
    sender
        .add_packet_to_send(SendTarget::Reliable(id), &chat("lost"), 0)
        .unwrap();

    let failure = timeout(Duration::from_secs(2), failures.recv())
        .await
        .expect("failure in time")
        .expect("failure channel open");
    assert_eq!(failure.connection_id, id);
    assert!(matches!(failure.error, TransportError::SendFailed(_)));
}

#[tokio::test]
async fn test_send_to_unknown_connection_is_dropped_quietly() {
    let (sender, worker, mut failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    sender
        .add_packet_to_send(SendTarget::Reliable(ConnectionId::new(999_999)), &chat("x"), 0)
        .unwrap();
    assert!(
        timeout(Duration::from_millis(50), failures.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_unregister_stops_delivery() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    let (local, mut remote) = tokio::io::duplex(1024);
    let id = ConnectionId::next();
    sender.register(id, Box::new(local)).unwrap();
    sender.unregister(id).unwrap();
    sender
        .add_packet_to_send(SendTarget::Reliable(id), &chat("gone"), 0)
        .unwrap();

    // The worker dropped its write half, so the reader sees EOF.
    let read = timeout(Duration::from_secs(2), read_frame(&mut remote))
        .await
        .expect("eof in time")
        .unwrap();
    assert!(read.is_none());
}

#[tokio::test]
async fn test_oversized_datagram_is_dropped() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap();
    let big = chat(&"x".repeat(MAX_DATAGRAM_SIZE));
    sender
        .add_packet_to_send(SendTarget::Datagram(addr), &big, 0)
        .unwrap();

    let mut buf = vec![0u8; 16];
    assert!(
        timeout(Duration::from_millis(100), receiver.recv_from(&mut buf))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_add_packet_after_shutdown_errors() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    let handle = tokio::spawn(worker.run());
    sender.shutdown();
    handle.await.unwrap();

    let err = sender
        .add_packet_to_send(SendTarget::Reliable(ConnectionId::new(1)), &chat("x"), 0)
        .unwrap_err();
    assert!(matches!(err, TransportError::Shutdown));
}

#[tokio::test]
async fn test_stalled_connection_does_not_block_others() {
    let (sender, worker, _failures) = send_channel(loopback_udp().await);
    tokio::spawn(worker.run());

    // Nobody reads from `_stalled_remote`, so writes to `stalled` block
    // once its 64-byte buffer is full.
    let (stalled, _stalled_remote) = tokio::io::duplex(64);
    let stalled_id = ConnectionId::next();
    sender.register(stalled_id, Box::new(stalled)).unwrap();
    for _ in 0..4 {
        sender
            .add_packet_to_send(SendTarget::Reliable(stalled_id), &chat(&"x".repeat(1024)), 0)
            .unwrap();
    }

    let (local, mut remote) = tokio::io::duplex(1024);
    let id = ConnectionId::next();
    sender.register(id, Box::new(local)).unwrap();
    sender
        .add_packet_to_send(SendTarget::Reliable(id), &chat("still flowing"), 0)
        .unwrap();

    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap();
    sender
        .add_packet_to_send(SendTarget::Datagram(addr), &chat("datagram"), 0)
        .unwrap();

    let frame = timeout(Duration::from_secs(2), read_frame(&mut remote))
        .await
        .expect("other connection not blocked")
        .unwrap()
        .unwrap();
    assert_eq!(Packet::decode(&frame).unwrap(), chat("still flowing"));

    let mut buf = vec![0u8; 2048];
    let (n, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .expect("datagrams not blocked")
        .unwrap();
    assert_eq!(Packet::decode(&buf[..n]).unwrap(), chat("datagram"));
}
