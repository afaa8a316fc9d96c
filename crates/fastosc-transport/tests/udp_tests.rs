//! UDP server tests
//!
//! Covers the pull pump, the async serve loop and replies sent through the
//! server socket.

use fastosc_core::{encode_message, ArgValue, Packet};
use fastosc_transport::{DatagramSender, PacketSink, UdpServer, UdpServerConfig};
use parking_lot::Mutex;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

/// Records every packet it receives; fails on addresses starting with /fail
#[derive(Default)]
struct Collect {
    packets: Mutex<Vec<(Packet, SocketAddr)>>,
}

impl Collect {
    fn addresses(&self) -> Vec<String> {
        self.packets
            .lock()
            .iter()
            .map(|(p, _)| match p {
                Packet::Message(m) => m.address.clone(),
                Packet::Bundle(_) => "#bundle".to_string(),
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.packets.lock().len()
    }
}

impl PacketSink for Collect {
    type Error = String;

    fn process_packet(&self, packet: &Packet, remote: SocketAddr) -> Result<(), String> {
        self.packets.lock().push((packet.clone(), remote));
        match packet {
            Packet::Message(m) if m.address.starts_with("/fail") => Err("handler failed".to_string()),
            _ => Ok(()),
        }
    }
}

fn client() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    socket
}

fn send(client: &UdpSocket, to: SocketAddr, address: &str, args: &[ArgValue]) {
    let frame = encode_message(address, args).unwrap();
    client.send_to(frame.as_bytes(), to).unwrap();
}

/// Pump the server until `expected` datagrams were handled
fn pump(server: &UdpServer, sink: &Collect, expected: usize) -> usize {
    let mut total = 0;
    for _ in 0..200 {
        total += server.process(sink);
        if total >= expected {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    total
}

#[test]
fn test_process_empty_socket_returns_immediately() {
    let server = UdpServer::bind("127.0.0.1:0").unwrap();
    let sink = Collect::default();
    assert_eq!(server.process(&sink), 0);
}

#[test]
fn test_process_drains_queue() {
    let server = UdpServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let sink = Collect::default();
    let client = client();

    send(&client, addr, "/one", &[1.into()]);
    send(&client, addr, "/two", &[]);

    assert_eq!(pump(&server, &sink, 2), 2);
    assert_eq!(sink.addresses(), vec!["/one", "/two"]);

    let from = sink.packets.lock()[0].1;
    assert_eq!(from, client.local_addr().unwrap());
}

#[test]
fn test_process_survives_bad_datagrams() {
    let server = UdpServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let sink = Collect::default();
    let client = client();

    client.send_to(b"not osc", addr).unwrap();
    client.send_to(b"/truncated", addr).unwrap();
    send(&client, addr, "/fail", &[]);
    send(&client, addr, "/after", &[]);

    assert_eq!(pump(&server, &sink, 4), 4);
    // Undecodable datagrams never reach the sink; a failing one does not stop the pump
    assert_eq!(sink.addresses(), vec!["/fail", "/after"]);
}

#[test]
fn test_reply_through_server() {
    let server = UdpServer::bind("127.0.0.1:0").unwrap();
    let client = client();

    let frame = encode_message("/reply", &["ok".into()]).unwrap();
    server
        .send_to(frame.as_bytes(), client.local_addr().unwrap())
        .unwrap();

    let mut buf = [0u8; 1024];
    let (len, from) = client.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], frame.as_bytes());
    assert_eq!(from, server.local_addr().unwrap());
}

#[test]
fn test_small_receive_buffer_truncates() {
    let server = UdpServer::bind_with_config(UdpServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        recv_buffer_size: 8,
    })
    .unwrap();
    let addr = server.local_addr().unwrap();
    let sink = Collect::default();
    let client = client();

    send(&client, addr, "/a/long/address", &["payload".into()]);

    assert_eq!(pump(&server, &sink, 1), 1);
    assert_eq!(sink.len(), 0);
}

#[tokio::test]
async fn test_serve_and_shutdown() {
    let server = Arc::new(UdpServer::bind("127.0.0.1:0").unwrap());
    let addr = server.local_addr().unwrap();
    let sink = Arc::new(Collect::default());

    let handle = {
        let server = Arc::clone(&server);
        let sink = Arc::clone(&sink);
        tokio::spawn(async move { server.serve(&*sink).await })
    };

    let client = client();
    send(&client, addr, "/served", &[0.5.into()]);

    for _ in 0..200 {
        if sink.len() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sink.addresses(), vec!["/served"]);
    assert!(server.is_running());

    server.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("serve loop should stop")
        .unwrap();
    assert!(result.is_ok());
    assert!(!server.is_running());
}
