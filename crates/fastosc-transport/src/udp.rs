//! UDP server
//!
//! One socket serves both directions: inbound datagrams are decoded and
//! handed to a [`PacketSink`], and the server itself is a
//! [`DatagramSender`] so replies leave from the bound port.
//!
//! Two receive styles are offered:
//! - [`UdpServer::process`] drains whatever is queued and returns, for
//!   hosts that pump the server from their own loop
//! - [`UdpServer::serve`] waits for datagrams until [`UdpServer::shutdown`]

use fastosc_core::{Error as CoreError, DEFAULT_PORT, MAX_DATAGRAM_SIZE};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{DatagramSender, PacketSink};

/// Pause after a receive error in [`UdpServer::serve`]
pub const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// UDP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpServerConfig {
    /// Local address to bind (e.g. "0.0.0.0:11000")
    pub bind_addr: String,
    /// Receive buffer size; longer datagrams are truncated
    pub recv_buffer_size: usize,
}

impl Default for UdpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

pub struct UdpServer {
    socket: UdpSocket,
    config: UdpServerConfig,
    running: AtomicBool,
    shutdown: Notify,
}

impl UdpServer {
    /// Bind to a local address with default settings
    pub fn bind(addr: &str) -> Result<Self> {
        Self::bind_with_config(UdpServerConfig {
            bind_addr: addr.to_string(),
            ..Default::default()
        })
    }

    pub fn bind_with_config(config: UdpServerConfig) -> Result<Self> {
        let socket = UdpSocket::bind(&config.bind_addr).map_err(|source| TransportError::BindFailed {
            addr: config.bind_addr.clone(),
            source,
        })?;
        socket.set_nonblocking(true)?;

        info!("UDP server bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            config,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    pub fn config(&self) -> &UdpServerConfig {
        &self.config
    }

    /// Synchronously handle every datagram queued on the socket.
    ///
    /// Returns the number of datagrams handled. The pump ends on the first
    /// socket error; a datagram that fails to decode or dispatch is logged
    /// and skipped.
    pub fn process<S: PacketSink + ?Sized>(&self, sink: &S) -> usize {
        let mut buf = vec![0u8; self.config.recv_buffer_size];
        let mut handled = 0;

        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    handle_datagram(&buf[..len], from, sink);
                    handled += 1;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                    // Seen on some platforms right after startup
                    warn!("Non-fatal socket error: {}", e);
                    break;
                }
                Err(e) => {
                    error!("Socket error: {}", e);
                    break;
                }
            }
        }

        handled
    }

    /// Receive and dispatch datagrams until [`shutdown`](Self::shutdown)
    /// is called. Socket errors are logged and do not stop the loop; each
    /// one pauses it for [`ERROR_BACKOFF`].
    pub async fn serve<S: PacketSink + ?Sized>(&self, sink: &S) -> Result<()> {
        let socket = tokio::net::UdpSocket::from_std(self.socket.try_clone()?)?;
        let mut buf = vec![0u8; self.config.recv_buffer_size];

        self.running.store(true, Ordering::SeqCst);
        info!("UDP server listening on {}", socket.local_addr()?);

        while self.running.load(Ordering::SeqCst) {
            let received = tokio::select! {
                _ = self.shutdown.notified() => break,
                received = socket.recv_from(&mut buf) => received,
            };
            match received {
                Ok((len, from)) => handle_datagram(&buf[..len], from, sink),
                Err(e) => {
                    if !self.pause_after_error(&e).await {
                        break;
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("UDP server stopped");
        Ok(())
    }

    /// Log a receive error and wait [`ERROR_BACKOFF`] so a repeating
    /// error cannot spin the loop. Returns `false` if shutdown was
    /// requested meanwhile.
    async fn pause_after_error(&self, e: &std::io::Error) -> bool {
        if e.kind() == ErrorKind::ConnectionReset {
            warn!("Non-fatal socket error: {}", e);
        } else {
            error!("Socket error: {}", e);
        }
        tokio::select! {
            _ = self.shutdown.notified() => false,
            _ = tokio::time::sleep(ERROR_BACKOFF) => true,
        }
    }

    /// Stop a running [`serve`](Self::serve) loop
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl DatagramSender for UdpServer {
    fn send_to(&self, data: &[u8], remote: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, remote)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

/// Classify, decode and hand one datagram to the sink
fn handle_datagram<S: PacketSink + ?Sized>(data: &[u8], from: SocketAddr, sink: &S) {
    match fastosc_core::decode(data) {
        Ok(packet) => {
            if let Err(e) = sink.process_packet(&packet, from) {
                error!("Error handling OSC message from {}: {}", from, e);
            }
        }
        Err(CoreError::UnknownDatagram) => {
            debug!("Unknown OSC datagram ({} bytes) from {}", data.len(), from);
        }
        Err(e) => {
            warn!("OSC decode error from {}: {}", from, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind() {
        let server = UdpServer::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.port() > 0);
        assert!(!server.is_running());
    }

    #[test]
    fn test_bind_failure() {
        let first = UdpServer::bind("127.0.0.1:0").unwrap();
        let taken = first.local_addr().unwrap().to_string();
        let result = UdpServer::bind(&taken);
        assert!(matches!(result, Err(TransportError::BindFailed { .. })));
    }

    #[tokio::test]
    async fn test_receive_error_pauses_loop() {
        let server = UdpServer::bind("127.0.0.1:0").unwrap();
        let refused = std::io::Error::from(ErrorKind::ConnectionRefused);

        let start = std::time::Instant::now();
        assert!(server.pause_after_error(&refused).await);
        assert!(start.elapsed() >= ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_error_pause() {
        let server = UdpServer::bind("127.0.0.1:0").unwrap();
        server.shutdown();

        let start = std::time::Instant::now();
        let reset = std::io::Error::from(ErrorKind::ConnectionReset);
        assert!(!server.pause_after_error(&reset).await);
        assert!(start.elapsed() < ERROR_BACKOFF);
    }

    #[test]
    fn test_default_config() {
        let config = UdpServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:11000");
        assert_eq!(config.recv_buffer_size, 65536);
    }
}
