//! Lifecycle shared by the watch and write streams.

use crate::backoff::ExponentialBackoff;
use crate::config::StreamConfig;
use crate::credentials::CredentialsProvider;
use crate::error::{StreamError, StreamResult};
use crate::transport::{
    Connector, EventSender, EventSink, FrameSender, Generation, StreamEvent, TransportEvent,
};
use cirrus_protocol::{ClientFrame, StreamKind};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Lifecycle state of a stream.
///
/// ```text
/// Initial --start--> Starting --opened--> Open
///    ^                  |                   |
///    |                  +------error--------+--> Error --start--> Starting
///    +------stop / clean close--------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// Never started, stopped, or closed cleanly.
    Initial,
    /// Waiting for the transport to open.
    Starting,
    /// Ready to send and receive frames.
    Open,
    /// Closed by an error. The stream can be started again.
    Error,
}

impl StreamState {
    /// Returns true while starting or open.
    pub fn is_started(&self) -> bool {
        matches!(self, StreamState::Starting | StreamState::Open)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Initial => write!(f, "Initial"),
            StreamState::Starting => write!(f, "Starting"),
            StreamState::Open => write!(f, "Open"),
            StreamState::Error => write!(f, "Error"),
        }
    }
}

/// Operations every stream supports.
pub trait Stream: Send {
    /// Opens a new connection.
    ///
    /// # Panics
    ///
    /// Panics if the stream is already started.
    fn start(&mut self);

    /// Abandons the current connection without notifying the delegate.
    /// Does nothing on a stream that is not started.
    fn stop(&mut self);

    /// Delivers one queued transport event.
    ///
    /// Events from connections the stream has abandoned are ignored.
    fn handle_event(&mut self, event: StreamEvent);

    /// Returns the current lifecycle state.
    fn state(&self) -> StreamState;

    /// Returns true while starting or open.
    fn is_started(&self) -> bool {
        self.state().is_started()
    }

    /// Returns true once the transport has opened.
    fn is_open(&self) -> bool {
        self.state() == StreamState::Open
    }
}

/// Connection bookkeeping embedded in each concrete stream.
pub(crate) struct StreamCore {
    kind: StreamKind,
    state: StreamState,
    config: StreamConfig,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialsProvider>,
    events: EventSender,
    last_generation: Generation,
    current: Option<Generation>,
    sender: Option<Box<dyn FrameSender>>,
    backoff: ExponentialBackoff,
}

impl StreamCore {
    pub(crate) fn new(
        kind: StreamKind,
        config: StreamConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialsProvider>,
        events: EventSender,
    ) -> Self {
        let backoff = ExponentialBackoff::new(config.backoff.clone());
        Self {
            kind,
            state: StreamState::Initial,
            config,
            connector,
            credentials,
            events,
            last_generation: Generation(0),
            current: None,
            sender: None,
            backoff,
        }
    }

    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    pub(crate) fn database(&self) -> &str {
        &self.config.database
    }

    pub(crate) fn next_restart_delay(&self) -> Duration {
        self.backoff.next_delay()
    }

    /// Opens a new connection. On an immediate connect failure the core is
    /// already in the error state when the error is returned.
    pub(crate) fn start(&mut self) -> StreamResult<()> {
        hard_assert!(
            !self.state.is_started(),
            "{} stream started while already {}",
            self.kind,
            self.state
        );

        let generation = self.last_generation.next();
        self.last_generation = generation;
        self.current = Some(generation);
        self.state = StreamState::Starting;
        debug!(stream = %self.kind, %generation, "starting stream");

        let token = self.credentials.token();
        let sink = EventSink::new(generation, self.events.clone());
        match self.connector.connect(self.kind, token, sink) {
            Ok(sender) => {
                self.sender = Some(sender);
                Ok(())
            }
            Err(error) => {
                warn!(stream = %self.kind, %error, "connect failed");
                self.close(Some(&error));
                Err(error)
            }
        }
    }

    /// Returns the event payload if it belongs to the live connection.
    pub(crate) fn accept(&self, event: StreamEvent) -> Option<TransportEvent> {
        if self.current != Some(event.generation) {
            trace!(
                stream = %self.kind,
                generation = %event.generation,
                "dropping event from abandoned connection"
            );
            return None;
        }
        Some(event.event)
    }

    pub(crate) fn mark_open(&mut self) {
        hard_assert!(
            self.state == StreamState::Starting,
            "{} stream opened while {}",
            self.kind,
            self.state
        );
        self.state = StreamState::Open;
        self.backoff.reset();
        debug!(stream = %self.kind, "stream open");
    }

    pub(crate) fn send(&mut self, frame: ClientFrame) -> StreamResult<()> {
        let Some(sender) = self.sender.as_mut() else {
            hard_fail!("{} stream has no connection to send on", self.kind);
        };
        trace!(stream = %self.kind, frame = frame.type_code(), "sending frame");
        sender.send(frame)
    }

    /// Abandons the connection and moves to `Error` or `Initial`.
    pub(crate) fn close(&mut self, error: Option<&StreamError>) {
        if let Some(mut sender) = self.sender.take() {
            sender.close();
        }
        self.current = None;
        match error {
            Some(error) => {
                self.backoff.record_failure();
                self.state = StreamState::Error;
                debug!(
                    stream = %self.kind,
                    %error,
                    failures = self.backoff.failures(),
                    "stream closed with error"
                );
            }
            None => {
                self.state = StreamState::Initial;
                debug!(stream = %self.kind, "stream closed");
            }
        }
    }

    pub(crate) fn stop(&mut self) {
        if self.state.is_started() {
            debug!(stream = %self.kind, "stopping stream");
            self.close(None);
        } else {
            self.state = StreamState::Initial;
        }
    }
}
