//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────────────────────────────────────────┐
//! │ Len (4)  │ Body                                         │
//! └──────────┴──────────────────────────────────────────────┘
//! ```
//!
//! ### Body
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────────┐
//! │ 0x01 (1) │  Id (8)  │ Tag (1)  │ Content fields          │
//! └──────────┴──────────┴──────────┴─────────────────────────┘
//! ```
//!
//! ### Content by Tag
//! - 0x02 COMMAND:      name (str) + param count (4) + params (bytes)*
//! - 0x03 RESPONSE:     code (1) + result count (4) + results (opt bytes)*
//! - 0x04 CLUSTER_INFO: cluster count (4) + (name (str) + url count (4) + urls (str)*)*
//!
//! `str`/`bytes` are a 4-byte length followed by the raw bytes. `opt bytes`
//! use a signed length where -1 marks an absent value. All integers are
//! big-endian.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{ClusterInfo, ClusterItem, Command, Message, MessageContent, Response, Status};
use crate::error::{KvdbError, Result};

/// Frame length prefix size
pub const HEADER_SIZE: usize = 4;

/// Maximum frame body size (16 MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Stable numeric tags of the payload kinds
pub mod tag {
    pub const MESSAGE: u8 = 0x01;
    pub const COMMAND: u8 = 0x02;
    pub const RESPONSE: u8 = 0x03;
    pub const CLUSTER_INFO: u8 = 0x04;
}

/// Length marker of an absent optional byte array
const ABSENT: i32 = -1;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a message body (no length prefix)
pub fn encode(message: &Message) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(tag::MESSAGE);
    buf.put_u64(message.id);

    match &message.content {
        MessageContent::Command(command) => encode_command(&mut buf, command),
        MessageContent::Response(response) => encode_response(&mut buf, response),
        MessageContent::ClusterInfo(info) => encode_cluster_info(&mut buf, info),
    }

    buf.freeze()
}

/// Encode a message as a length-prefixed frame
pub fn encode_frame(message: &Message) -> Bytes {
    let body = encode(message);
    let mut frame = BytesMut::with_capacity(HEADER_SIZE + body.len());
    frame.put_u32(body.len() as u32);
    frame.extend_from_slice(&body);
    frame.freeze()
}

fn encode_command(buf: &mut BytesMut, command: &Command) {
    buf.put_u8(tag::COMMAND);
    put_bytes(buf, command.name.as_bytes());
    buf.put_u32(command.parameters.len() as u32);
    for param in &command.parameters {
        put_bytes(buf, param);
    }
}

fn encode_response(buf: &mut BytesMut, response: &Response) {
    buf.put_u8(tag::RESPONSE);
    buf.put_u8(response.code as u8);
    buf.put_u32(response.result.len() as u32);
    for item in &response.result {
        match item {
            Some(bytes) => {
                buf.put_i32(bytes.len() as i32);
                buf.extend_from_slice(bytes);
            }
            None => buf.put_i32(ABSENT),
        }
    }
}

fn encode_cluster_info(buf: &mut BytesMut, info: &ClusterInfo) {
    buf.put_u8(tag::CLUSTER_INFO);
    buf.put_u32(info.clusters.len() as u32);
    for item in &info.clusters {
        put_bytes(buf, item.name.as_bytes());
        buf.put_u32(item.urls.len() as u32);
        for url in &item.urls {
            put_bytes(buf, url.as_bytes());
        }
    }
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    buf.put_u32(bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a message body (no length prefix)
///
/// The whole input must be consumed; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Message> {
    let mut reader = FieldReader::new(bytes);

    let envelope = reader.u8()?;
    if envelope != tag::MESSAGE {
        return Err(KvdbError::Decode(format!(
            "expected message tag 0x{:02x}, got 0x{:02x}",
            tag::MESSAGE,
            envelope
        )));
    }
    let id = reader.u64()?;

    let content = match reader.u8()? {
        tag::COMMAND => MessageContent::Command(decode_command(&mut reader)?),
        tag::RESPONSE => MessageContent::Response(decode_response(&mut reader)?),
        tag::CLUSTER_INFO => MessageContent::ClusterInfo(decode_cluster_info(&mut reader)?),
        other => {
            return Err(KvdbError::Decode(format!(
                "unknown content tag: 0x{:02x}",
                other
            )))
        }
    };

    if reader.remaining() != 0 {
        return Err(KvdbError::Decode(format!(
            "{} trailing bytes after message",
            reader.remaining()
        )));
    }

    Ok(Message { id, content })
}

fn decode_command(reader: &mut FieldReader<'_>) -> Result<Command> {
    let name = reader.string()?;
    let count = reader.count()?;
    let mut parameters = Vec::with_capacity(count);
    for _ in 0..count {
        parameters.push(reader.bytes()?);
    }
    Ok(Command { name, parameters })
}

fn decode_response(reader: &mut FieldReader<'_>) -> Result<Response> {
    let code = match reader.u8()? {
        0x00 => Status::Success,
        0x01 => Status::Error,
        other => {
            return Err(KvdbError::Decode(format!(
                "unknown response code: 0x{:02x}",
                other
            )))
        }
    };
    let count = reader.count()?;
    let mut result = Vec::with_capacity(count);
    for _ in 0..count {
        result.push(reader.optional_bytes()?);
    }
    Ok(Response { code, result })
}

fn decode_cluster_info(reader: &mut FieldReader<'_>) -> Result<ClusterInfo> {
    let count = reader.count()?;
    let mut clusters = Vec::with_capacity(count);
    for _ in 0..count {
        let name = reader.string()?;
        let url_count = reader.count()?;
        let mut urls = Vec::with_capacity(url_count);
        for _ in 0..url_count {
            urls.push(reader.string()?);
        }
        clusters.push(ClusterItem { name, urls });
    }
    Ok(ClusterInfo { clusters })
}

/// Bounds-checked cursor over a frame body
struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() < len {
            return Err(KvdbError::Decode(format!(
                "truncated frame: needed {} bytes, {} left",
                len,
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let raw = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(raw);
        Ok(u64::from_be_bytes(arr))
    }

    /// Element count; each element needs at least 4 bytes so a count larger
    /// than the remaining input can be rejected before allocating
    fn count(&mut self) -> Result<usize> {
        let count = self.u32()? as usize;
        if count > self.buf.len() / 4 {
            return Err(KvdbError::Decode(format!(
                "element count {} exceeds remaining {} bytes",
                count,
                self.buf.len()
            )));
        }
        Ok(count)
    }

    fn bytes(&mut self) -> Result<Bytes> {
        let len = self.u32()? as usize;
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }

    fn optional_bytes(&mut self) -> Result<Option<Bytes>> {
        let raw = self.take(4)?;
        let len = i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        match len {
            ABSENT => Ok(None),
            len if len < 0 => Err(KvdbError::Decode(format!("negative length: {}", len))),
            len => Ok(Some(Bytes::copy_from_slice(self.take(len as usize)?))),
        }
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| KvdbError::Decode(format!("invalid UTF-8 string: {}", e)))
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete message frame from a stream
///
/// Blocks until a complete frame is received or an error occurs. I/O errors
/// (including EOF) surface as `KvdbError::Io`; malformed content as
/// `KvdbError::Decode`.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Message> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let body_len = u32::from_be_bytes(header);
    if body_len > MAX_FRAME_SIZE {
        return Err(KvdbError::Decode(format!(
            "frame too large: {} bytes (max {})",
            body_len, MAX_FRAME_SIZE
        )));
    }

    let mut body = vec![0u8; body_len as usize];
    reader.read_exact(&mut body)?;

    decode(&body)
}

/// Write a message frame to a stream
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    let frame = encode_frame(message);
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}
