//! Probe message model and datagram framing

pub mod naming;

pub use naming::ProbeNamer;

use crate::error::AppError;
use thiserror::Error;

/// First byte of every frame
pub const FRAME_MAGIC: u8 = 0xA7;
/// Framing version understood by this build
pub const FRAME_VERSION: u8 = 1;

const KIND_REQUEST: u8 = 1;
const KIND_RESPONSE: u8 = 2;

/// magic + version + kind + name length
const HEADER_LEN: usize = 1 + 1 + 1 + 2;

/// A decoded transport message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Probe request naming the content it asks for
    Request { name: String },
    /// Data response carrying the echoed payload
    Response { name: String, payload: Vec<u8> },
    /// A well-formed frame of a kind the prober does not use
    Other { kind: u8 },
}

impl Message {
    /// Name carried by requests and responses
    pub fn name(&self) -> Option<&str> {
        match self {
            Message::Request { name } | Message::Response { name, .. } => Some(name),
            Message::Other { .. } => None,
        }
    }
}

/// Framing errors for malformed datagrams
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("bad frame magic 0x{0:02x}")]
    BadMagic(u8),

    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),

    #[error("probe name is not valid UTF-8")]
    InvalidName,

    #[error("{field} too long: {len} bytes")]
    TooLong { field: &'static str, len: usize },

    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
}

impl From<CodecError> for AppError {
    fn from(error: CodecError) -> Self {
        AppError::codec(error.to_string())
    }
}

/// Builds probe requests and reads fields out of responses
pub trait MessageCodec: Send + Sync {
    /// Request message for a probe name
    fn build_probe_request(&self, name: &str) -> Message;

    /// Whether the message is a data response
    fn is_response(&self, message: &Message) -> bool;

    /// Name of a response; `None` for anything else
    fn extract_name<'a>(&self, message: &'a Message) -> Option<&'a str>;

    /// Payload size of a response; 0 for anything else
    fn extract_payload_size(&self, message: &Message) -> usize;
}

/// Binary framing used on the wire
///
/// ```text
/// +-------+---------+------+----------+------+-------------+---------+
/// | magic | version | kind | name len | name | payload len | payload |
/// |  u8   |   u8    |  u8  |  u16 BE  |      |   u32 BE    |         |
/// +-------+---------+------+----------+------+-------------+---------+
/// ```
///
/// Requests carry an empty payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCodec;

impl WireCodec {
    pub fn new() -> Self {
        Self
    }

    /// Serialize a message into one datagram
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let (kind, name, payload): (u8, &str, &[u8]) = match message {
            Message::Request { name } => (KIND_REQUEST, name, &[]),
            Message::Response { name, payload } => (KIND_RESPONSE, name, payload),
            Message::Other { kind } => (*kind, "", &[]),
        };

        let name_len = u16::try_from(name.len())
            .map_err(|_| CodecError::TooLong { field: "name", len: name.len() })?;
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| CodecError::TooLong { field: "payload", len: payload.len() })?;

        let mut frame = Vec::with_capacity(HEADER_LEN + name.len() + 4 + payload.len());
        frame.push(FRAME_MAGIC);
        frame.push(FRAME_VERSION);
        frame.push(kind);
        frame.extend_from_slice(&name_len.to_be_bytes());
        frame.extend_from_slice(name.as_bytes());
        frame.extend_from_slice(&payload_len.to_be_bytes());
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// Parse one datagram
    pub fn decode(&self, frame: &[u8]) -> Result<Message, CodecError> {
        let mut reader = FrameReader { frame, offset: 0 };

        let magic = reader.take_u8()?;
        if magic != FRAME_MAGIC {
            return Err(CodecError::BadMagic(magic));
        }
        let version = reader.take_u8()?;
        if version != FRAME_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let kind = reader.take_u8()?;

        let name_len = usize::from(reader.take_u16()?);
        let name = std::str::from_utf8(reader.take(name_len)?)
            .map_err(|_| CodecError::InvalidName)?
            .to_string();

        let payload_len = reader.take_u32()? as usize;
        let payload = reader.take(payload_len)?.to_vec();

        let trailing = reader.remaining();
        if trailing > 0 {
            return Err(CodecError::TrailingBytes(trailing));
        }

        Ok(match kind {
            KIND_REQUEST => Message::Request { name },
            KIND_RESPONSE => Message::Response { name, payload },
            other => Message::Other { kind: other },
        })
    }
}

impl MessageCodec for WireCodec {
    fn build_probe_request(&self, name: &str) -> Message {
        Message::Request { name: name.to_string() }
    }

    fn is_response(&self, message: &Message) -> bool {
        matches!(message, Message::Response { .. })
    }

    fn extract_name<'a>(&self, message: &'a Message) -> Option<&'a str> {
        match message {
            Message::Response { name, .. } => Some(name),
            _ => None,
        }
    }

    fn extract_payload_size(&self, message: &Message) -> usize {
        match message {
            Message::Response { payload, .. } => payload.len(),
            _ => 0,
        }
    }
}

struct FrameReader<'a> {
    frame: &'a [u8],
    offset: usize,
}

impl<'a> FrameReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.frame.len()).ok_or(
            CodecError::Truncated {
                needed: self.offset.saturating_add(len),
                available: self.frame.len(),
            },
        )?;
        let bytes = &self.frame[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn take_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn take_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn remaining(&self) -> usize {
        self.frame.len() - self.offset
    }
}
