//! Transport channel abstraction and the UDP implementation

pub mod udp;

pub use udp::UdpTransport;

use crate::codec::Message;
use crate::error::AppError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// How a transport failure affects the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The failed operation is lost; later ones may succeed
    Transient,
    /// The session is unusable
    Persistent,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Transient => "transient",
            FaultKind::Persistent => "persistent",
        }
    }
}

/// Last error reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    pub kind: FaultKind,
    /// OS error code, or -1 when there is none
    pub code: i32,
    pub message: String,
}

impl TransportFault {
    pub fn new<S: Into<String>>(kind: FaultKind, code: i32, message: S) -> Self {
        Self { kind, code, message: message.into() }
    }

    pub fn transient<S: Into<String>>(code: i32, message: S) -> Self {
        Self::new(FaultKind::Transient, code, message)
    }

    pub fn persistent<S: Into<String>>(code: i32, message: S) -> Self {
        Self::new(FaultKind::Persistent, code, message)
    }

    pub fn from_io(kind: FaultKind, error: &std::io::Error) -> Self {
        Self::new(kind, error.raw_os_error().unwrap_or(-1), error.to_string())
    }

    pub fn is_persistent(&self) -> bool {
        self.kind == FaultKind::Persistent
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {}, {})", self.message, self.code, self.kind.as_str())
    }
}

impl From<TransportFault> for AppError {
    fn from(fault: TransportFault) -> Self {
        AppError::transport(fault.to_string())
    }
}

/// A session with a peer that exchanges probe messages
///
/// `send` reports success as a plain bool; the details of a failure are kept
/// for `last_error`. `receive` waits at most `timeout` and returns `None`
/// when nothing arrived in time or the transport failed.
#[async_trait]
pub trait TransportChannel: Send {
    async fn send(&mut self, message: Message) -> bool;

    async fn receive(&mut self, timeout: Duration) -> Option<Message>;

    fn last_error(&self) -> Option<TransportFault>;

    /// Name prefix the session is bound to
    fn prefix(&self) -> &str;

    /// End the session; later sends fail persistently
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display_and_conversion() {
        let fault = TransportFault::persistent(9, "bad file descriptor");
        assert!(fault.is_persistent());
        assert_eq!(fault.to_string(), "bad file descriptor (code 9, persistent)");

        let err: AppError = fault.into();
        assert_eq!(err.category(), "TRANSPORT");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_fault_from_io() {
        let io = std::io::Error::from_raw_os_error(111);
        let fault = TransportFault::from_io(FaultKind::Transient, &io);
        assert_eq!(fault.code, 111);
        assert!(!fault.is_persistent());

        let custom = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(TransportFault::from_io(FaultKind::Persistent, &custom).code, -1);
    }
}
