//! Datagram transport over a connected tokio UDP socket

use super::{FaultKind, TransportChannel, TransportFault};
use crate::codec::{Message, WireCodec};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// Consecutive non-refusal I/O failures before the session is declared dead
pub const MAX_CONSECUTIVE_FAILURES: u32 = 16;

/// Largest datagram the receive buffer accepts
const RECEIVE_BUFFER_SIZE: usize = 65_535;

/// UDP session with one peer, bound to a name prefix
///
/// Responses whose names fall outside the prefix and datagrams that do not
/// decode are discarded without surfacing to the caller.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    peer: SocketAddr,
    prefix: String,
    codec: WireCodec,
    buffer: Vec<u8>,
    last_error: Option<TransportFault>,
    consecutive_failures: u32,
}

impl UdpTransport {
    /// Bind locally and connect to `peer`
    pub async fn connect(bind: SocketAddr, peer: SocketAddr, prefix: &str) -> Result<Self> {
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| AppError::io(format!("Failed to bind {}: {}", bind, e)))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| AppError::transport(format!("Failed to connect to {}: {}", peer, e)))?;

        Ok(Self {
            socket: Some(socket),
            peer,
            prefix: prefix.trim_end_matches('/').to_string(),
            codec: WireCodec::new(),
            buffer: vec![0; RECEIVE_BUFFER_SIZE],
            last_error: None,
            consecutive_failures: 0,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        match &self.socket {
            Some(socket) => Ok(socket.local_addr()?),
            None => Err(AppError::transport("session closed")),
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Responses must carry a name under the session prefix
    fn accepts(&self, message: &Message) -> bool {
        match message {
            Message::Response { name, .. } => name
                .strip_prefix(self.prefix.as_str())
                .map_or(false, |rest| rest.is_empty() || rest.starts_with('/')),
            _ => true,
        }
    }

    fn note_failure(&mut self, error: &io::Error) {
        // An ICMP refusal only means the peer is not listening yet
        if error.kind() == io::ErrorKind::ConnectionRefused {
            self.last_error = Some(TransportFault::from_io(FaultKind::Transient, error));
            return;
        }

        self.consecutive_failures += 1;
        let kind = if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            FaultKind::Persistent
        } else {
            FaultKind::Transient
        };
        self.last_error = Some(TransportFault::from_io(kind, error));
    }

    fn note_closed(&mut self) {
        self.last_error = Some(TransportFault::persistent(-1, "session closed"));
    }

    fn has_failed(&self) -> bool {
        self.last_error.as_ref().map_or(false, TransportFault::is_persistent)
    }
}

#[async_trait]
impl TransportChannel for UdpTransport {
    async fn send(&mut self, message: Message) -> bool {
        let frame = match self.codec.encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                self.last_error = Some(TransportFault::transient(-1, e.to_string()));
                return false;
            }
        };

        let result = match &self.socket {
            Some(socket) => socket.send(&frame).await,
            None => {
                self.note_closed();
                return false;
            }
        };

        match result {
            Ok(_) => {
                self.consecutive_failures = 0;
                true
            }
            Err(e) => {
                self.note_failure(&e);
                false
            }
        }
    }

    async fn receive(&mut self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;

        loop {
            let result = {
                let socket = match &self.socket {
                    Some(socket) => socket,
                    None => {
                        self.note_closed();
                        return None;
                    }
                };

                if timeout.is_zero() {
                    socket.try_recv(&mut self.buffer)
                } else {
                    match tokio::time::timeout_at(deadline, socket.recv(&mut self.buffer)).await {
                        Ok(result) => result,
                        Err(_) => return None,
                    }
                }
            };

            match result {
                Ok(len) => {
                    self.consecutive_failures = 0;
                    if let Ok(message) = self.codec.decode(&self.buffer[..len]) {
                        if self.accepts(&message) {
                            return Some(message);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) => {
                    self.note_failure(&e);
                    if self.has_failed() {
                        return None;
                    }
                }
            }

            if !timeout.is_zero() && Instant::now() >= deadline {
                return None;
            }
        }
    }

    fn last_error(&self) -> Option<TransportFault> {
        self.last_error.clone()
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn close(&mut self) {
        self.socket = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn loopback_pair() -> (UdpTransport, UdpSocket) {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpTransport::connect(
            "127.0.0.1:0".parse().unwrap(),
            peer.local_addr().unwrap(),
            "lci:/test/",
        )
        .await
        .unwrap();
        peer.connect(transport.local_addr().unwrap()).await.unwrap();
        (transport, peer)
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let (mut transport, peer) = loopback_pair().await;
        let codec = WireCodec::new();
        assert_eq!(transport.prefix(), "lci:/test");

        assert!(transport.send(Message::Request { name: "lci:/test/1".to_string() }).await);

        let mut buf = vec![0; 1024];
        let len = peer.recv(&mut buf).await.unwrap();
        assert_eq!(codec.decode(&buf[..len]).unwrap(), Message::Request { name: "lci:/test/1".to_string() });
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let (mut transport, _peer) = loopback_pair().await;
        assert!(transport.receive(Duration::from_millis(20)).await.is_none());
        assert!(transport.receive(Duration::ZERO).await.is_none());
        assert!(transport.last_error().is_none());
    }

    #[tokio::test]
    async fn test_filters_foreign_and_garbage_datagrams() {
        let (mut transport, peer) = loopback_pair().await;
        let codec = WireCodec::new();

        peer.send(&[1, 2, 3]).await.unwrap();
        let foreign = Message::Response { name: "lci:/testing/1".to_string(), payload: vec![1] };
        peer.send(&codec.encode(&foreign).unwrap()).await.unwrap();
        let ours = Message::Response { name: "lci:/test/7".to_string(), payload: vec![0; 16] };
        peer.send(&codec.encode(&ours).unwrap()).await.unwrap();

        assert_eq!(transport.receive(Duration::from_secs(2)).await, Some(ours));
    }

    #[tokio::test]
    async fn test_closed_session_fails_persistently() {
        let (mut transport, _peer) = loopback_pair().await;
        transport.close().await;

        assert!(!transport.is_open());
        assert!(!transport.send(Message::Request { name: "lci:/test/1".to_string() }).await);
        assert!(transport.last_error().unwrap().is_persistent());
        assert!(transport.receive(Duration::from_millis(5)).await.is_none());
    }
}
