//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! One length-prefixed frame per [`Message`]. The body is a tagged binary
//! record, so a single decoder recovers the payload kind without any schema
//! exchange:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬───────────────────┐
//! │ Len (4)  │ 0x01 (1) │  Id (8)  │ Tag (1)  │ Content           │
//! └──────────┴──────────┴──────────┴──────────┴───────────────────┘
//! ```
//!
//! ### Tags
//! - 0x01: MESSAGE      - envelope
//! - 0x02: COMMAND      - name + parameters
//! - 0x03: RESPONSE     - code + results
//! - 0x04: CLUSTER_INFO - cluster topology
//!
//! ### Response Codes
//! - 0x00: SUCCESS
//! - 0x01: ERROR

mod codec;
mod command;
mod message;
mod response;
mod uri;

pub use codec::{
    decode, encode, encode_frame, read_message, tag, write_message, HEADER_SIZE, MAX_FRAME_SIZE,
};
pub use command::{Command, CommandType};
pub use message::{ClusterInfo, ClusterItem, Message, MessageContent};
pub use response::{decode_flag, encode_flag, Response, Status};
pub use uri::KvdbUri;
