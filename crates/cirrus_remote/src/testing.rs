//! Helpers for driving streams synchronously in tests.
//!
//! Pair a stream with [`MockConnector`](crate::MockConnector), play the
//! server through its connections, then call [`pump`] to deliver the queued
//! events the way a driver task would.

use crate::error::StreamError;
use crate::stream::Stream;
use crate::transport::EventReceiver;
use crate::watch_stream::WatchStreamDelegate;
use crate::write_stream::WriteStreamDelegate;
use cirrus_model::{MutationBatchResult, SnapshotVersion};
use cirrus_protocol::WatchChange;

/// Delivers every queued event to `stream`. Returns how many were delivered.
pub fn pump<S: Stream>(stream: &mut S, events: &mut EventReceiver) -> usize {
    let mut delivered = 0;
    while let Ok(event) = events.try_recv() {
        stream.handle_event(event);
        delivered += 1;
    }
    delivered
}

/// A callback observed by [`RecordingWatchDelegate`].
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// `on_open`.
    Open,
    /// `on_change`.
    Change(WatchChange, SnapshotVersion),
    /// `on_close`.
    Close(Option<StreamError>),
}

/// Watch delegate that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingWatchDelegate {
    /// Callbacks received so far.
    pub events: Vec<WatchEvent>,
}

impl RecordingWatchDelegate {
    /// Returns the changes received, in order.
    pub fn changes(&self) -> Vec<(WatchChange, SnapshotVersion)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                WatchEvent::Change(change, version) => Some((change.clone(), *version)),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of close callbacks received.
    pub fn close_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, WatchEvent::Close(_)))
            .count()
    }
}

impl WatchStreamDelegate for RecordingWatchDelegate {
    fn on_open(&mut self) {
        self.events.push(WatchEvent::Open);
    }

    fn on_change(&mut self, change: WatchChange, snapshot_version: SnapshotVersion) {
        self.events.push(WatchEvent::Change(change, snapshot_version));
    }

    fn on_close(&mut self, error: Option<StreamError>) {
        self.events.push(WatchEvent::Close(error));
    }
}

/// A callback observed by [`RecordingWriteDelegate`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteEvent {
    /// `on_open`.
    Open,
    /// `on_handshake_complete`.
    HandshakeComplete,
    /// `on_mutation_result`.
    MutationResult(MutationBatchResult),
    /// `on_close`.
    Close(Option<StreamError>),
}

/// Write delegate that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingWriteDelegate {
    /// Callbacks received so far.
    pub events: Vec<WriteEvent>,
}

impl RecordingWriteDelegate {
    /// Returns the acknowledged batches, in order.
    pub fn results(&self) -> Vec<MutationBatchResult> {
        self.events
            .iter()
            .filter_map(|event| match event {
                WriteEvent::MutationResult(result) => Some(result.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of close callbacks received.
    pub fn close_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, WriteEvent::Close(_)))
            .count()
    }
}

impl WriteStreamDelegate for RecordingWriteDelegate {
    fn on_open(&mut self) {
        self.events.push(WriteEvent::Open);
    }

    fn on_handshake_complete(&mut self) {
        self.events.push(WriteEvent::HandshakeComplete);
    }

    fn on_mutation_result(&mut self, result: MutationBatchResult) {
        self.events.push(WriteEvent::MutationResult(result));
    }

    fn on_close(&mut self, error: Option<StreamError>) {
        self.events.push(WriteEvent::Close(error));
    }
}
