//! # Cirrus Protocol
//!
//! Frames exchanged on the watch and write streams.
//!
//! This crate provides:
//! - Client frames (listen, unlisten, handshake, mutation batch)
//! - Server frames (watch change, handshake ack, write result)
//! - Watch change types (target, document, existence filter)
//! - Status codes carried as causes and close reasons
//! - CBOR encoding/decoding for byte-oriented transports
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod error;
mod messages;
mod status;
mod watch_change;

pub use codec::{decode_frame, encode_frame, FrameCodec};
pub use error::{CodecError, CodecResult};
pub use messages::{
    ClientFrame, HandshakeRequest, HandshakeResponse, ListenRequest, ListenResponse, ServerFrame,
    StreamKind, UnlistenRequest, WriteRequest, WriteResponse,
};
pub use status::{Code, Status};
pub use watch_change::{
    DocumentWatchChange, ExistenceFilterWatchChange, TargetChangeState, WatchChange,
    WatchTargetChange,
};
