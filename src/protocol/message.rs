//! Message envelope
//!
//! Every frame on the wire carries exactly one `Message`. The `id` is a
//! connection-scoped correlation token picked by the client and echoed by the
//! server in its reply.

use super::{Command, Response};

/// Envelope wrapping exactly one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Correlation token
    pub id: u64,

    /// Payload
    pub content: MessageContent,
}

/// Payload kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Command(Command),
    Response(Response),
    ClusterInfo(ClusterInfo),
}

/// Full cluster topology as published to routing-aware clients
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    pub clusters: Vec<ClusterItem>,
}

/// Named shard group and the KVDB URIs of its member databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterItem {
    pub name: String,
    pub urls: Vec<String>,
}

impl ClusterItem {
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            urls,
        }
    }
}

impl Message {
    pub fn command(id: u64, command: Command) -> Self {
        Self {
            id,
            content: MessageContent::Command(command),
        }
    }

    pub fn response(id: u64, response: Response) -> Self {
        Self {
            id,
            content: MessageContent::Response(response),
        }
    }

    pub fn cluster_info(id: u64, info: ClusterInfo) -> Self {
        Self {
            id,
            content: MessageContent::ClusterInfo(info),
        }
    }

    /// Borrow the command payload, if this is a request
    pub fn as_command(&self) -> Option<&Command> {
        match &self.content {
            MessageContent::Command(command) => Some(command),
            _ => None,
        }
    }
}
