//! Common test helpers and utilities for FastOSC tests
//!
//! This crate provides:
//! - A sender that records outbound frames instead of sending them
//! - A subscription provider that records subscriptions and fires changes
//! - Condition-based waiting (no hardcoded sleeps)
//! - A served dispatcher and a blocking client for end-to-end tests

use bytes::Bytes;
use fastosc_core::{decode, encode_message, ArgValue, Message, Packet};
use fastosc_router::{CancelHandle, ChangeCallback, Dispatcher, SubscriptionProvider};
use fastosc_transport::{DatagramSender, Result as TransportResult, UdpServer};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Addresses and ports
// ============================================================================

/// A loopback endpoint for the given port
pub fn remote(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Find an available UDP port for testing
pub fn find_available_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

// ============================================================================
// Condition-based waiting
// ============================================================================

/// Wait for a condition with timeout
pub async fn wait_for<F>(check: F, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        tokio::time::sleep(DEFAULT_CHECK_INTERVAL).await;
    }
    check()
}

// ============================================================================
// Recording sender
// ============================================================================

/// Records every frame handed to it
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(SocketAddr, Bytes)>>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Raw frames in send order
    pub fn frames(&self) -> Vec<(SocketAddr, Bytes)> {
        self.sent.lock().clone()
    }

    /// Decoded messages in send order
    pub fn messages(&self) -> Vec<(SocketAddr, Message)> {
        self.sent
            .lock()
            .iter()
            .filter_map(|(to, data)| match decode(data) {
                Ok(Packet::Message(m)) => Some((*to, m)),
                _ => None,
            })
            .collect()
    }

    /// Addresses of the decoded messages in send order
    pub fn addresses(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, m)| m.address).collect()
    }

    /// Drain and return the decoded messages
    pub fn take(&self) -> Vec<(SocketAddr, Message)> {
        let messages = self.messages();
        self.sent.lock().clear();
        messages
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl DatagramSender for RecordingSender {
    fn send_to(&self, data: &[u8], remote: SocketAddr) -> TransportResult<()> {
        self.sent.lock().push((remote, Bytes::copy_from_slice(data)));
        Ok(())
    }
}

// ============================================================================
// Mock subscription provider
// ============================================================================

struct Subscription {
    address: String,
    args: Vec<ArgValue>,
    on_change: ChangeCallback,
}

/// Records subscriptions and lets tests fire change notifications.
///
/// Addresses listed with [`unwatchable`](Self::unwatchable) refuse
/// subscriptions, like properties that cannot be observed.
#[derive(Default)]
pub struct MockProvider {
    next_id: AtomicUsize,
    active: Arc<Mutex<HashMap<usize, Subscription>>>,
    unwatchable: Mutex<HashSet<String>>,
    subscribes: AtomicUsize,
    cancels: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse subscriptions for this address
    pub fn unwatchable(&self, address: &str) {
        self.unwatchable.lock().insert(address.to_string());
    }

    /// Number of successful subscribe calls
    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    /// Number of cancellation calls
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Invoke the change callback of every active subscription on
    /// `address`; returns how many were fired
    pub fn fire(&self, address: &str) -> usize {
        let callbacks: Vec<ChangeCallback> = self
            .active
            .lock()
            .values()
            .filter(|s| s.address == address)
            .map(|s| Arc::clone(&s.on_change))
            .collect();
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    /// Arguments of active subscriptions on `address`
    pub fn active_args(&self, address: &str) -> Vec<Vec<ArgValue>> {
        self.active
            .lock()
            .values()
            .filter(|s| s.address == address)
            .map(|s| s.args.clone())
            .collect()
    }
}

impl SubscriptionProvider for MockProvider {
    fn subscribe(&self, address: &str, args: &[ArgValue], on_change: ChangeCallback) -> Option<CancelHandle> {
        if self.unwatchable.lock().contains(address) {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.active.lock().insert(
            id,
            Subscription {
                address: address.to_string(),
                args: args.to_vec(),
                on_change,
            },
        );
        self.subscribes.fetch_add(1, Ordering::SeqCst);

        let active = Arc::clone(&self.active);
        let cancels = Arc::clone(&self.cancels);
        Some(CancelHandle::new(move || {
            active.lock().remove(&id);
            cancels.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

// ============================================================================
// Served dispatcher and client
// ============================================================================

/// A dispatcher served over loopback UDP; stops on drop.
///
/// Pair it with [`TestClient`] only on a multi-threaded runtime, since the
/// client blocks while waiting for replies.
pub struct TestServer {
    server: Arc<UdpServer>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Bind an ephemeral port, install the server as the dispatcher's
    /// sender and start serving
    pub fn start(dispatcher: Arc<Dispatcher>) -> Self {
        let server = Arc::new(UdpServer::bind("127.0.0.1:0").unwrap());
        dispatcher.set_sender(server.clone());

        let serving = Arc::clone(&server);
        let handle = tokio::spawn(async move {
            let _ = serving.serve(&*dispatcher).await;
        });

        Self {
            server,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.local_addr().unwrap()
    }

    pub fn server(&self) -> &Arc<UdpServer> {
        &self.server
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// A blocking loopback client
pub struct TestClient {
    socket: UdpSocket,
}

impl TestClient {
    pub fn new() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(DEFAULT_TIMEOUT)).unwrap();
        Self { socket }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    pub fn send(&self, to: SocketAddr, address: &str, args: &[ArgValue]) {
        let frame = encode_message(address, args).unwrap();
        self.socket.send_to(frame.as_bytes(), to).unwrap();
    }

    pub fn send_raw(&self, to: SocketAddr, data: &[u8]) {
        self.socket.send_to(data, to).unwrap();
    }

    /// Next message, or `None` if nothing arrives within `wait`
    pub fn recv(&self, wait: Duration) -> Option<Message> {
        self.socket.set_read_timeout(Some(wait)).unwrap();
        let mut buf = vec![0u8; fastosc_core::MAX_DATAGRAM_SIZE];
        let (len, _) = self.socket.recv_from(&mut buf).ok()?;
        match decode(&buf[..len]) {
            Ok(Packet::Message(m)) => Some(m),
            _ => None,
        }
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
