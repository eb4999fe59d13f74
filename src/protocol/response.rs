//! Response definitions
//!
//! Represents responses to clients.

use bytes::Bytes;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    Error = 0x01,
}

/// A response to send to client
///
/// On `Success`, `result` holds one element per requested key in request
/// order, `None` marking an absent value. On `Error`, `result` holds exactly
/// one element: the UTF-8 error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub code: Status,

    /// Positional result buffers
    pub result: Vec<Option<Bytes>>,
}

impl Response {
    /// Create a SUCCESS response
    pub fn success(result: Vec<Option<Bytes>>) -> Self {
        Self {
            code: Status::Success,
            result,
        }
    }

    /// Create a SUCCESS response with no payload
    pub fn ok() -> Self {
        Self::success(Vec::new())
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            code: Status::Error,
            result: vec![Some(Bytes::copy_from_slice(message.as_bytes()))],
        }
    }

    /// SUCCESS response carrying one existence flag per key
    pub fn flags(flags: &[bool]) -> Self {
        Self::success(flags.iter().map(|&f| Some(encode_flag(f))).collect())
    }

    pub fn is_success(&self) -> bool {
        self.code == Status::Success
    }

    /// Error text of an ERROR response
    pub fn error_message(&self) -> Option<String> {
        if self.code != Status::Error {
            return None;
        }
        let text = match self.result.first() {
            Some(Some(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => String::new(),
        };
        Some(text)
    }
}

/// Existence flags are 4-byte big-endian integers, 1 for present
pub fn encode_flag(flag: bool) -> Bytes {
    Bytes::copy_from_slice(&(flag as i32).to_be_bytes())
}

/// Inverse of [`encode_flag`]; `None` if the buffer is not a 4-byte integer
pub fn decode_flag(bytes: &[u8]) -> Option<bool> {
    let raw: [u8; 4] = bytes.try_into().ok()?;
    Some(i32::from_be_bytes(raw) == 1)
}
