//! Transport layer abstraction for the remote streams.
//!
//! A [`Connector`] opens one bidirectional channel per stream start. The
//! stream writes [`ClientFrame`]s through the returned [`FrameSender`]; the
//! transport reports everything it observes through an [`EventSink`], which
//! queues [`StreamEvent`]s for the stream's owner to deliver on its own
//! context.
//!
//! Every sink is tagged with the [`Generation`] of the connection it was
//! created for. Stopping or restarting a stream moves it to a new
//! generation, so events still in flight from an abandoned connection are
//! recognized and dropped.

use crate::credentials::Token;
use crate::error::{StreamError, StreamResult};
use cirrus_protocol::{ClientFrame, ServerFrame, StreamKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one connection attempt of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    /// Returns the following generation.
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen:{}", self.0)
    }
}

/// Something the transport observed on a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The channel is ready to carry frames.
    Opened,
    /// A frame arrived from the server.
    Frame(ServerFrame),
    /// The channel closed, with an error unless the close was clean.
    Closed(Option<StreamError>),
}

/// A transport event tagged with the connection it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Connection the event belongs to.
    pub generation: Generation,
    /// The event itself.
    pub event: TransportEvent,
}

/// Sending half of a stream's event queue.
pub type EventSender = mpsc::UnboundedSender<StreamEvent>;

/// Receiving half of a stream's event queue.
pub type EventReceiver = mpsc::UnboundedReceiver<StreamEvent>;

/// Creates the event queue a stream and its owner share.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Handle through which a transport reports events for one connection.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: Generation,
    tx: EventSender,
}

impl EventSink {
    /// Creates a sink for a connection generation.
    pub fn new(generation: Generation, tx: EventSender) -> Self {
        Self { generation, tx }
    }

    /// Returns the generation this sink reports for.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Reports that the channel opened.
    ///
    /// Returns false once the stream's owner has gone away.
    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Opened)
    }

    /// Reports an incoming frame.
    pub fn frame(&self, frame: ServerFrame) -> bool {
        self.emit(TransportEvent::Frame(frame))
    }

    /// Reports that the channel closed.
    pub fn closed(&self, error: Option<StreamError>) -> bool {
        self.emit(TransportEvent::Closed(error))
    }

    fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(StreamEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Outgoing half of an open channel.
pub trait FrameSender: Send {
    /// Writes a frame to the channel.
    fn send(&mut self, frame: ClientFrame) -> StreamResult<()>;

    /// Closes the channel. No further events are expected for it.
    fn close(&mut self);
}

/// Opens channels to the backend.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (gRPC, WebSocket, mock for testing, etc.).
pub trait Connector: Send + Sync {
    /// Starts opening a channel of `kind`.
    ///
    /// The connector must report [`TransportEvent::Opened`] through `sink`
    /// once the channel is usable, and [`TransportEvent::Closed`] when it
    /// ends. An immediate failure is returned as an error instead.
    fn connect(
        &self,
        kind: StreamKind,
        token: Option<Token>,
        sink: EventSink,
    ) -> StreamResult<Box<dyn FrameSender>>;
}

/// One connection recorded by [`MockConnector`].
///
/// The handle drives the connection from the server side and inspects what
/// the client sent.
#[derive(Debug, Clone)]
pub struct MockConnection {
    kind: StreamKind,
    token: Option<Token>,
    sink: EventSink,
    sent: Arc<Mutex<Vec<ClientFrame>>>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

impl MockConnection {
    /// Returns the kind of stream that opened this connection.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Returns the token presented when connecting.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Returns the generation the connection reports for.
    pub fn generation(&self) -> Generation {
        self.sink.generation()
    }

    /// Reports the channel as open.
    pub fn open(&self) {
        self.sink.opened();
    }

    /// Delivers a frame from the server.
    pub fn deliver(&self, frame: ServerFrame) {
        self.sink.frame(frame);
    }

    /// Closes the channel with an error.
    pub fn fail(&self, error: StreamError) {
        self.sink.closed(Some(error));
    }

    /// Closes the channel cleanly.
    pub fn close_cleanly(&self) {
        self.sink.closed(None);
    }

    /// Makes every later send on this connection fail.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Returns the frames the client sent, in order.
    pub fn sent_frames(&self) -> Vec<ClientFrame> {
        self.sent.lock().clone()
    }

    /// Returns true once the client closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockSender {
    sent: Arc<Mutex<Vec<ClientFrame>>>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

impl FrameSender for MockSender {
    fn send(&mut self, frame: ClientFrame) -> StreamResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StreamError::transport_fatal("send on closed connection"));
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(StreamError::transport_retryable("mock send failure"));
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A mock connector for testing.
///
/// Records every connection so tests can play the server side.
#[derive(Debug, Default)]
pub struct MockConnector {
    connections: Mutex<Vec<MockConnection>>,
    connect_failures: Mutex<VecDeque<StreamError>>,
}

impl MockConnector {
    /// Creates a new mock connector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next connect attempt fail immediately with `error`.
    pub fn fail_next_connect(&self, error: StreamError) {
        self.connect_failures.lock().push_back(error);
    }

    /// Returns the number of successful connect calls.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Returns every recorded connection, oldest first.
    pub fn connections(&self) -> Vec<MockConnection> {
        self.connections.lock().clone()
    }

    /// Returns the most recent connection.
    pub fn last_connection(&self) -> Option<MockConnection> {
        self.connections.lock().last().cloned()
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        kind: StreamKind,
        token: Option<Token>,
        sink: EventSink,
    ) -> StreamResult<Box<dyn FrameSender>> {
        if let Some(error) = self.connect_failures.lock().pop_front() {
            return Err(error);
        }

        let connection = MockConnection {
            kind,
            token,
            sink,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_sends: Arc::new(AtomicBool::new(false)),
        };
        let sender = MockSender {
            sent: Arc::clone(&connection.sent),
            closed: Arc::clone(&connection.closed),
            fail_sends: Arc::clone(&connection.fail_sends),
        };
        self.connections.lock().push(connection);
        Ok(Box::new(sender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_model::TargetId;
    use cirrus_protocol::UnlistenRequest;

    fn unlisten(id: i32) -> ClientFrame {
        ClientFrame::Unlisten(UnlistenRequest {
            database: String::new(),
            target_id: TargetId(id),
        })
    }

    #[test]
    fn sink_tags_events_with_generation() {
        let (tx, mut rx) = event_channel();
        let sink = EventSink::new(Generation(7), tx);

        assert!(sink.opened());
        assert!(sink.closed(None));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.generation, Generation(7));
        assert_eq!(first.event, TransportEvent::Opened);
        assert_eq!(rx.try_recv().unwrap().event, TransportEvent::Closed(None));
    }

    #[test]
    fn sink_reports_dropped_receiver() {
        let (tx, rx) = event_channel();
        let sink = EventSink::new(Generation(1), tx);
        drop(rx);
        assert!(!sink.opened());
    }

    #[test]
    fn mock_records_sent_frames() {
        let (tx, _rx) = event_channel();
        let connector = MockConnector::new();
        let mut sender = connector
            .connect(StreamKind::Watch, None, EventSink::new(Generation(1), tx))
            .unwrap();

        sender.send(unlisten(1)).unwrap();
        sender.send(unlisten(2)).unwrap();

        let connection = connector.last_connection().unwrap();
        assert_eq!(connection.kind(), StreamKind::Watch);
        assert_eq!(connection.sent_frames(), vec![unlisten(1), unlisten(2)]);

        sender.close();
        assert!(connection.is_closed());
        assert!(sender.send(unlisten(3)).is_err());
    }

    #[test]
    fn mock_connect_failure_is_consumed_once() {
        let (tx, _rx) = event_channel();
        let connector = MockConnector::new();
        connector.fail_next_connect(StreamError::ConnectFailed("refused".into()));

        let first_sink = EventSink::new(Generation(1), tx.clone());
        let first = connector.connect(StreamKind::Write, None, first_sink);
        assert!(matches!(first, Err(StreamError::ConnectFailed(_))));

        let second_sink = EventSink::new(Generation(2), tx);
        let second = connector.connect(StreamKind::Write, None, second_sink);
        assert!(second.is_ok());
        assert_eq!(connector.connection_count(), 1);
    }
}
