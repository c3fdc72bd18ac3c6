//! Frames exchanged on the watch and write streams.

use crate::watch_change::WatchChange;
use bytes::Bytes;
use cirrus_model::{Mutation, MutationResult, QueryData, SnapshotVersion, TargetId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two long-lived streams a frame travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Server-pushed change notifications.
    Watch,
    /// Client-initiated mutation submission.
    Write,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamKind::Watch => "watch",
            StreamKind::Write => "write",
        })
    }
}

/// A frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientFrame {
    /// Start listening to a target.
    Listen(ListenRequest),
    /// Stop listening to a target.
    Unlisten(UnlistenRequest),
    /// Open a write session.
    Handshake(HandshakeRequest),
    /// Submit one mutation batch.
    Write(WriteRequest),
}

impl ClientFrame {
    /// Returns the message type code.
    pub fn type_code(&self) -> u8 {
        match self {
            ClientFrame::Listen(_) => 1,
            ClientFrame::Unlisten(_) => 2,
            ClientFrame::Handshake(_) => 3,
            ClientFrame::Write(_) => 4,
        }
    }

    /// Returns the stream the frame belongs on.
    pub fn stream_kind(&self) -> StreamKind {
        match self {
            ClientFrame::Listen(_) | ClientFrame::Unlisten(_) => StreamKind::Watch,
            ClientFrame::Handshake(_) | ClientFrame::Write(_) => StreamKind::Write,
        }
    }
}

/// A frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerFrame {
    /// A watch change with its snapshot version.
    Listen(ListenResponse),
    /// Acknowledgment of the write handshake.
    HandshakeAck(HandshakeResponse),
    /// Acknowledgment of the oldest outstanding mutation batch.
    WriteResult(WriteResponse),
}

impl ServerFrame {
    /// Returns the message type code.
    pub fn type_code(&self) -> u8 {
        match self {
            ServerFrame::Listen(_) => 101,
            ServerFrame::HandshakeAck(_) => 102,
            ServerFrame::WriteResult(_) => 103,
        }
    }

    /// Returns the stream the frame belongs on.
    pub fn stream_kind(&self) -> StreamKind {
        match self {
            ServerFrame::Listen(_) => StreamKind::Watch,
            ServerFrame::HandshakeAck(_) | ServerFrame::WriteResult(_) => StreamKind::Write,
        }
    }
}

/// Listen request for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenRequest {
    /// Database resource name.
    pub database: String,
    /// Target descriptor, with its snapshot version already cleared.
    pub target: QueryData,
}

/// Unlisten request for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlistenRequest {
    /// Database resource name.
    pub database: String,
    /// Target to remove.
    pub target_id: TargetId,
}

/// Write-stream handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Database resource name.
    pub database: String,
    /// Token of a previous write session to resume, possibly empty.
    pub stream_token: Bytes,
}

/// One mutation batch on the write stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Database resource name.
    pub database: String,
    /// Token from the latest server response.
    pub stream_token: Bytes,
    /// Mutations of the batch, in order.
    pub mutations: Vec<Mutation>,
}

/// A watch change and the version it is valid as of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenResponse {
    /// The change.
    pub change: WatchChange,
    /// Snapshot version the server attached.
    pub snapshot_version: SnapshotVersion,
}

impl ListenResponse {
    /// Creates a listen response.
    pub fn new(change: impl Into<WatchChange>, snapshot_version: SnapshotVersion) -> Self {
        Self {
            change: change.into(),
            snapshot_version,
        }
    }
}

/// Server reply to the write handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Token identifying the write session.
    pub stream_token: Bytes,
}

/// Server reply to one mutation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    /// Updated session token.
    pub stream_token: Bytes,
    /// Version at which the batch was committed.
    pub commit_version: SnapshotVersion,
    /// One result per mutation, in mutation order.
    pub results: Vec<MutationResult>,
}
