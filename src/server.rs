//! Echo server answering probe requests under one name prefix

use crate::{
    codec::{Message, WireCodec},
    error::{AppError, Result},
    logging::Logger,
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

const RECEIVE_BUFFER_SIZE: usize = 65_535;

/// Counters kept while serving
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Requests answered
    pub answered: u64,
    /// Datagrams that did not decode, were not requests, or named another prefix
    pub ignored: u64,
    /// Responses the socket refused to send
    pub send_failures: u64,
}

/// Answers every request under `prefix` with a same-name response
pub struct EchoServer {
    socket: UdpSocket,
    prefix: String,
    payload: Vec<u8>,
    codec: WireCodec,
    logger: Logger,
    stats: ServerStats,
}

impl EchoServer {
    pub async fn bind(addr: SocketAddr, prefix: &str, payload_size: usize) -> Result<Self> {
        crate::models::config::validate_prefix(prefix)?;
        if payload_size > crate::defaults::MAX_PAYLOAD_SIZE {
            return Err(AppError::config(format!(
                "Payload size {} exceeds the maximum of {} bytes",
                payload_size,
                crate::defaults::MAX_PAYLOAD_SIZE
            )));
        }

        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| AppError::io(format!("Failed to bind {}: {}", addr, e)))?;

        Ok(Self {
            socket,
            prefix: prefix.trim_end_matches('/').to_string(),
            payload: vec![0; payload_size],
            codec: WireCodec::new(),
            logger: Logger::new("SERVER".to_string()),
            stats: ServerStats::default(),
        })
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    /// Serve until the socket fails
    pub async fn serve(&mut self) -> Result<ServerStats> {
        self.serve_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves or the socket fails
    pub async fn serve_until<F>(&mut self, shutdown: F) -> Result<ServerStats>
    where
        F: Future<Output = ()>,
    {
        self.logger
            .info(&format!("Serving {} with {} byte payloads", self.prefix, self.payload.len()))
            .field("prefix", &self.prefix)
            .field("payload_size", self.payload.len())
            .log()
            .await;

        tokio::pin!(shutdown);
        let mut buffer = vec![0; RECEIVE_BUFFER_SIZE];

        loop {
            let received = tokio::select! {
                _ = &mut shutdown => break,
                received = self.socket.recv_from(&mut buffer) => received,
            };

            match received {
                Ok((len, from)) => self.answer(&buffer[..len], from).await,
                // A previous reply bounced off a closed client port
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => continue,
                Err(e) => {
                    self.logger
                        .error(&format!("Receive failed: {}", e))
                        .log()
                        .await;
                    return Err(AppError::transport(format!("Server socket failed: {}", e)));
                }
            }
        }

        self.logger
            .info("Server shut down")
            .field("answered", self.stats.answered)
            .field("ignored", self.stats.ignored)
            .field("send_failures", self.stats.send_failures)
            .log()
            .await;
        Ok(self.stats)
    }

    fn serves(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
    }

    async fn answer(&mut self, datagram: &[u8], from: SocketAddr) {
        let name = match self.codec.decode(datagram) {
            Ok(Message::Request { name }) if self.serves(&name) => name,
            Ok(message) => {
                self.stats.ignored += 1;
                self.logger
                    .trace(&format!("Ignored {:?} from {}", message.name(), from))
                    .log()
                    .await;
                return;
            }
            Err(e) => {
                self.stats.ignored += 1;
                self.logger.debug(&format!("Undecodable datagram from {}: {}", from, e)).log().await;
                return;
            }
        };

        let response = Message::Response { name, payload: self.payload.clone() };
        let frame = match self.codec.encode(&response) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.send_failures += 1;
                self.logger.warn(&format!("Failed to encode response: {}", e)).log().await;
                return;
            }
        };

        match self.socket.send_to(&frame, from).await {
            Ok(_) => {
                self.stats.answered += 1;
                if let Some(name) = response.name() {
                    self.logger.debug(&format!("Answered {}", name)).field("peer", from.to_string()).log().await;
                }
            }
            Err(e) => {
                self.stats.send_failures += 1;
                self.logger
                    .warn(&format!("Failed to answer {}: {}", from, e))
                    .field("peer", from.to_string())
                    .log()
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn client_for(addr: SocketAddr) -> UdpSocket {
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(addr).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_rejects_bad_settings() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        assert!(EchoServer::bind(addr, "no-scheme", 16).await.is_err());
        assert!(EchoServer::bind(addr, "lci:/a", 64_001).await.is_err());
    }

    #[tokio::test]
    async fn test_answers_requests_under_prefix() {
        let mut server = EchoServer::bind("127.0.0.1:0".parse().unwrap(), "lci:/echo/", 128).await.unwrap();
        assert_eq!(server.prefix(), "lci:/echo");
        let client = client_for(server.local_addr().unwrap()).await;
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let stats = server.serve_until(async { let _ = stopped.await; }).await.unwrap();
            (server, stats)
        });

        let codec = WireCodec::new();
        client.send(&[0xff, 0x00]).await.unwrap();
        let foreign = Message::Request { name: "lci:/echoes/1".to_string() };
        client.send(&codec.encode(&foreign).unwrap()).await.unwrap();
        let ours = Message::Request { name: "lci:/echo/abc/128/000100".to_string() };
        client.send(&codec.encode(&ours).unwrap()).await.unwrap();

        let mut buf = vec![0; RECEIVE_BUFFER_SIZE];
        let len = tokio::time::timeout(Duration::from_secs(2), client.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        match codec.decode(&buf[..len]).unwrap() {
            Message::Response { name, payload } => {
                assert_eq!(name, "lci:/echo/abc/128/000100");
                assert_eq!(payload.len(), 128);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        stop.send(()).unwrap();
        let (server, stats) = handle.await.unwrap();
        assert_eq!(stats.answered, 1);
        assert_eq!(stats.ignored, 2);
        assert_eq!(server.stats(), stats);
    }
}
