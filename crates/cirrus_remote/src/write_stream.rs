//! Stream that sends mutation batches and receives their acknowledgements.

use crate::config::StreamConfig;
use crate::credentials::CredentialsProvider;
use crate::error::StreamError;
use crate::stream::{Stream, StreamCore, StreamState};
use crate::transport::{Connector, EventSender, StreamEvent, TransportEvent};
use bytes::Bytes;
use cirrus_model::{MutationBatch, MutationBatchResult};
use cirrus_protocol::{
    ClientFrame, HandshakeRequest, HandshakeResponse, ServerFrame, StreamKind, WriteRequest,
    WriteResponse,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Receives the events of a [`WriteStream`].
pub trait WriteStreamDelegate: Send {
    /// The transport opened; the handshake may now be written.
    fn on_open(&mut self);

    /// The handshake was sent; batches may now be written.
    fn on_handshake_complete(&mut self);

    /// The server acknowledged the oldest pending batch.
    fn on_mutation_result(&mut self, result: MutationBatchResult);

    /// The stream closed. `error` is `None` for a clean close.
    fn on_close(&mut self, error: Option<StreamError>);
}

/// Stream that writes mutation batches to the backend.
///
/// After opening, the caller writes the handshake once, then any number of
/// batches. The server acknowledges batches in the order they were written.
pub struct WriteStream<D> {
    core: StreamCore,
    delegate: D,
    pending_writes: VecDeque<MutationBatch>,
    handshake_complete: bool,
    last_stream_token: Bytes,
}

impl<D: WriteStreamDelegate> WriteStream<D> {
    /// Creates a stopped write stream.
    pub fn new(
        config: StreamConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialsProvider>,
        events: EventSender,
        delegate: D,
    ) -> Self {
        Self {
            core: StreamCore::new(StreamKind::Write, config, connector, credentials, events),
            delegate,
            pending_writes: VecDeque::new(),
            handshake_complete: false,
            last_stream_token: Bytes::new(),
        }
    }

    /// Sends the handshake carrying the last stream token.
    ///
    /// The handshake counts as complete as soon as it is sent.
    ///
    /// # Panics
    ///
    /// Panics if the stream is not open or the handshake was already sent.
    pub fn write_handshake(&mut self) {
        hard_assert!(
            self.is_open(),
            "write_handshake called on a write stream that is {}",
            self.state()
        );
        hard_assert!(
            !self.handshake_complete,
            "write_handshake called twice on the same connection"
        );

        debug!(token_len = self.last_stream_token.len(), "writing handshake");
        let frame = ClientFrame::Handshake(HandshakeRequest {
            database: self.core.database().to_string(),
            stream_token: self.last_stream_token.clone(),
        });
        if !self.send(frame) {
            return;
        }

        self.handshake_complete = true;
        self.delegate.on_handshake_complete();
    }

    /// Sends a mutation batch and queues it until the server acknowledges it.
    ///
    /// # Panics
    ///
    /// Panics if the handshake has not completed.
    pub fn write_mutations(&mut self, batch: MutationBatch) {
        hard_assert!(
            self.handshake_complete,
            "write_mutations called before the handshake completed"
        );
        hard_assert!(
            self.is_open(),
            "write_mutations called on a write stream that is {}",
            self.state()
        );

        debug!(batch_id = %batch.batch_id(), mutations = batch.mutations().len(), "writing batch");
        let frame = ClientFrame::Write(WriteRequest {
            database: self.core.database().to_string(),
            stream_token: self.last_stream_token.clone(),
            mutations: batch.mutations().to_vec(),
        });
        self.pending_writes.push_back(batch);
        self.send(frame);
    }

    /// Returns true once the handshake has been sent on this connection.
    pub fn is_handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    /// Returns the token from the most recent server response.
    pub fn last_stream_token(&self) -> &Bytes {
        &self.last_stream_token
    }

    /// Sets the token the next handshake resumes from.
    pub fn set_last_stream_token(&mut self, token: Bytes) {
        self.last_stream_token = token;
    }

    /// Returns the batches written but not yet acknowledged, oldest first.
    ///
    /// After an error close these remain available until the next start.
    pub fn pending_writes(&self) -> &VecDeque<MutationBatch> {
        &self.pending_writes
    }

    /// Returns how long to wait before restarting after an error close.
    pub fn next_restart_delay(&self) -> Duration {
        self.core.next_restart_delay()
    }

    /// Returns the delegate.
    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    /// Returns the delegate mutably.
    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    fn send(&mut self, frame: ClientFrame) -> bool {
        match self.core.send(frame) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "write stream send failed");
                self.close_with(Some(error));
                false
            }
        }
    }

    fn close_with(&mut self, error: Option<StreamError>) {
        self.handshake_complete = false;
        self.core.close(error.as_ref());
        self.delegate.on_close(error);
    }

    fn handle_handshake_response(&mut self, response: HandshakeResponse) {
        debug!("handshake acknowledged");
        self.last_stream_token = response.stream_token;
    }

    fn handle_write_response(&mut self, response: WriteResponse) {
        let Some(batch) = self.pending_writes.pop_front() else {
            hard_fail!("write result received with no pending writes");
        };
        hard_assert!(
            response.results.len() == batch.mutations().len(),
            "{} mutation results for {} with {} mutations",
            response.results.len(),
            batch.batch_id(),
            batch.mutations().len()
        );

        debug!(
            batch_id = %batch.batch_id(),
            commit_version = %response.commit_version,
            "batch acknowledged"
        );
        self.last_stream_token = response.stream_token.clone();
        let result = MutationBatchResult::new(
            batch,
            response.commit_version,
            response.results,
            response.stream_token,
        );
        self.delegate.on_mutation_result(result);
    }
}

impl<D: WriteStreamDelegate> Stream for WriteStream<D> {
    fn start(&mut self) {
        self.handshake_complete = false;
        self.pending_writes.clear();
        if let Err(error) = self.core.start() {
            self.delegate.on_close(Some(error));
        }
    }

    fn stop(&mut self) {
        self.core.stop();
        self.handshake_complete = false;
        self.pending_writes.clear();
    }

    fn handle_event(&mut self, event: StreamEvent) {
        let Some(event) = self.core.accept(event) else {
            return;
        };

        match event {
            TransportEvent::Opened if self.is_open() => {
                self.close_with(Some(StreamError::Protocol("opened twice".into())));
            }
            TransportEvent::Opened => {
                self.core.mark_open();
                self.delegate.on_open();
            }
            TransportEvent::Frame(frame) if !self.is_open() => {
                self.close_with(Some(StreamError::Protocol(format!(
                    "{} frame before the write stream opened",
                    frame.type_code()
                ))));
            }
            TransportEvent::Frame(ServerFrame::HandshakeAck(response)) => {
                self.handle_handshake_response(response);
            }
            TransportEvent::Frame(ServerFrame::WriteResult(response)) => {
                self.handle_write_response(response);
            }
            TransportEvent::Frame(ServerFrame::Listen(_)) => {
                self.close_with(Some(StreamError::Protocol(
                    "unexpected watch frame on the write stream".into(),
                )));
            }
            TransportEvent::Closed(error) => self.close_with(error),
        }
    }

    fn state(&self) -> StreamState {
        self.core.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::EmptyCredentials;
    use crate::testing::{pump, RecordingWriteDelegate, WriteEvent};
    use crate::transport::{event_channel, EventReceiver, MockConnector};
    use cirrus_model::{
        BatchId, DocumentKey, FieldValue, Mutation, MutationResult, ObjectValue, SnapshotVersion,
        Timestamp,
    };

    struct Fixture {
        stream: WriteStream<RecordingWriteDelegate>,
        connector: Arc<MockConnector>,
        events: EventReceiver,
    }

    impl Fixture {
        fn new() -> Self {
            let (tx, events) = event_channel();
            let connector = Arc::new(MockConnector::new());
            let stream = WriteStream::new(
                StreamConfig::new("db"),
                Arc::clone(&connector) as Arc<dyn Connector>,
                Arc::new(EmptyCredentials),
                tx,
                RecordingWriteDelegate::default(),
            );
            Self {
                stream,
                connector,
                events,
            }
        }

        fn open(&mut self) {
            self.stream.start();
            self.connector.last_connection().unwrap().open();
            pump(&mut self.stream, &mut self.events);
        }

        fn deliver(&mut self, frame: ServerFrame) {
            self.connector.last_connection().unwrap().deliver(frame);
            pump(&mut self.stream, &mut self.events);
        }
    }

    fn batch(id: i32, mutations: usize) -> MutationBatch {
        let key = DocumentKey::from_path_string("rooms/eros").unwrap();
        let mutations = (0..mutations)
            .map(|i| {
                Mutation::set(
                    key.clone(),
                    ObjectValue::from_fields([("n", FieldValue::from(i as i64))]),
                )
            })
            .collect();
        MutationBatch::new(BatchId(id), Timestamp::from_seconds(1), mutations).unwrap()
    }

    fn write_result(token: &'static [u8], results: usize) -> ServerFrame {
        ServerFrame::WriteResult(WriteResponse {
            stream_token: Bytes::from_static(token),
            commit_version: SnapshotVersion::from_seconds(10),
            results: vec![MutationResult::new(SnapshotVersion::from_seconds(10)); results],
        })
    }

    #[test]
    fn handshake_sends_last_token() {
        let mut fx = Fixture::new();
        fx.stream.set_last_stream_token(Bytes::from_static(b"resume"));
        fx.open();
        fx.stream.write_handshake();

        assert!(fx.stream.is_handshake_complete());
        assert_eq!(
            fx.stream.delegate().events,
            vec![WriteEvent::Open, WriteEvent::HandshakeComplete]
        );
        let sent = fx.connector.last_connection().unwrap().sent_frames();
        assert!(matches!(
            &sent[..],
            [ClientFrame::Handshake(HandshakeRequest { stream_token, .. })]
                if stream_token.as_ref() == b"resume"
        ));
    }

    #[test]
    fn handshake_ack_records_token() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_handshake();
        fx.deliver(ServerFrame::HandshakeAck(HandshakeResponse {
            stream_token: Bytes::from_static(b"t1"),
        }));
        assert_eq!(fx.stream.last_stream_token().as_ref(), b"t1");
    }

    #[test]
    fn results_acknowledge_batches_in_order() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_handshake();
        fx.stream.write_mutations(batch(1, 1));
        fx.stream.write_mutations(batch(2, 2));

        fx.deliver(write_result(b"a", 1));
        fx.deliver(write_result(b"b", 2));

        let acked: Vec<BatchId> = fx
            .stream
            .delegate()
            .results()
            .iter()
            .map(|r| r.batch().batch_id())
            .collect();
        assert_eq!(acked, vec![BatchId(1), BatchId(2)]);
        assert_eq!(fx.stream.last_stream_token().as_ref(), b"b");
        assert!(fx.stream.pending_writes().is_empty());
    }

    #[test]
    #[should_panic(expected = "before the handshake completed")]
    fn write_before_handshake_panics() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_mutations(batch(1, 1));
    }

    #[test]
    #[should_panic(expected = "called twice")]
    fn second_handshake_panics() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_handshake();
        fx.stream.write_handshake();
    }

    #[test]
    #[should_panic(expected = "no pending writes")]
    fn unsolicited_result_panics() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_handshake();
        fx.deliver(write_result(b"x", 1));
    }

    #[test]
    #[should_panic(expected = "mutation results for")]
    fn result_count_mismatch_panics() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_handshake();
        fx.stream.write_mutations(batch(1, 2));
        fx.deliver(write_result(b"x", 1));
    }

    #[test]
    fn error_close_keeps_queue_until_restart() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_handshake();
        fx.stream.write_mutations(batch(1, 1));

        fx.connector
            .last_connection()
            .unwrap()
            .fail(StreamError::transport_retryable("reset"));
        pump(&mut fx.stream, &mut fx.events);

        assert_eq!(fx.stream.state(), StreamState::Error);
        assert!(!fx.stream.is_handshake_complete());
        assert_eq!(fx.stream.pending_writes().len(), 1);

        fx.stream.start();
        assert!(fx.stream.pending_writes().is_empty());
    }

    #[test]
    fn stop_clears_queue_and_handshake() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.write_handshake();
        fx.stream.write_mutations(batch(1, 1));
        fx.stream.stop();

        assert_eq!(fx.stream.state(), StreamState::Initial);
        assert!(!fx.stream.is_handshake_complete());
        assert!(fx.stream.pending_writes().is_empty());
        assert!(fx.connector.last_connection().unwrap().is_closed());
        // Stop never reports a close.
        assert!(!fx
            .stream
            .delegate()
            .events
            .iter()
            .any(|e| matches!(e, WriteEvent::Close(_))));
    }

    #[test]
    fn failed_handshake_send_does_not_complete() {
        let mut fx = Fixture::new();
        fx.open();
        fx.connector.last_connection().unwrap().fail_sends();
        fx.stream.write_handshake();

        assert!(!fx.stream.is_handshake_complete());
        assert_eq!(fx.stream.state(), StreamState::Error);
    }

    #[test]
    fn duplicate_open_closes_with_error() {
        let mut fx = Fixture::new();
        fx.open();
        fx.connector.last_connection().unwrap().open();
        pump(&mut fx.stream, &mut fx.events);

        assert_eq!(fx.stream.state(), StreamState::Error);
        assert_eq!(
            fx.stream.delegate().events,
            vec![
                WriteEvent::Open,
                WriteEvent::Close(Some(StreamError::Protocol("opened twice".into())))
            ]
        );
        assert!(fx.connector.last_connection().unwrap().is_closed());
    }
}
