//! Stream that listens to query targets and reports watch changes.

use crate::config::StreamConfig;
use crate::credentials::CredentialsProvider;
use crate::error::StreamError;
use crate::stream::{Stream, StreamCore, StreamState};
use crate::transport::{Connector, EventSender, StreamEvent, TransportEvent};
use bytes::Bytes;
use cirrus_model::{QueryData, SnapshotVersion, TargetId};
use cirrus_protocol::{
    ClientFrame, ListenRequest, ListenResponse, ServerFrame, StreamKind, UnlistenRequest,
    WatchChange, WatchTargetChange,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Receives the events of a [`WatchStream`].
pub trait WatchStreamDelegate: Send {
    /// The transport opened; targets may now be watched.
    fn on_open(&mut self);

    /// A watch change arrived.
    ///
    /// `snapshot_version` is [`SnapshotVersion::NONE`] whenever the change
    /// is a target change naming specific targets.
    fn on_change(&mut self, change: WatchChange, snapshot_version: SnapshotVersion);

    /// The stream closed. `error` is `None` for a clean close.
    fn on_close(&mut self, error: Option<StreamError>);
}

/// Stream that listens to targets on the backend.
///
/// Targets are registered with [`watch_query`](Self::watch_query) and
/// tracked until unwatched or removed by the server with a cause.
pub struct WatchStream<D> {
    core: StreamCore,
    delegate: D,
    active_targets: BTreeMap<TargetId, QueryData>,
}

impl<D: WatchStreamDelegate> WatchStream<D> {
    /// Creates a stopped watch stream.
    pub fn new(
        config: StreamConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialsProvider>,
        events: EventSender,
        delegate: D,
    ) -> Self {
        Self {
            core: StreamCore::new(StreamKind::Watch, config, connector, credentials, events),
            delegate,
            active_targets: BTreeMap::new(),
        }
    }

    /// Starts listening to `query`.
    ///
    /// The target's snapshot version is cleared before it is sent; its
    /// resume token, if any, is kept. Watching an id that is already active
    /// replaces the stored entry.
    ///
    /// # Panics
    ///
    /// Panics if the stream is not open.
    pub fn watch_query(&mut self, query: QueryData) {
        hard_assert!(
            self.is_open(),
            "watch_query called on a watch stream that is {}",
            self.state()
        );

        let target = query.with_snapshot_version(SnapshotVersion::NONE);
        debug!(target_id = %target.target_id, "watching target");
        self.active_targets.insert(target.target_id, target.clone());

        let frame = ClientFrame::Listen(ListenRequest {
            database: self.core.database().to_string(),
            target,
        });
        self.send(frame);
    }

    /// Stops listening to `target_id`.
    ///
    /// The unlisten request is sent even if the id is not active.
    ///
    /// # Panics
    ///
    /// Panics if the stream is not open.
    pub fn unwatch_target_id(&mut self, target_id: TargetId) {
        hard_assert!(
            self.is_open(),
            "unwatch_target_id called on a watch stream that is {}",
            self.state()
        );

        if self.active_targets.remove(&target_id).is_none() {
            debug!(%target_id, "unwatching target that is not active");
        }

        let frame = ClientFrame::Unlisten(UnlistenRequest {
            database: self.core.database().to_string(),
            target_id,
        });
        self.send(frame);
    }

    /// Returns the targets currently being watched.
    pub fn active_targets(&self) -> &BTreeMap<TargetId, QueryData> {
        &self.active_targets
    }

    /// Returns the stored data for one active target.
    pub fn active_target(&self, target_id: TargetId) -> Option<&QueryData> {
        self.active_targets.get(&target_id)
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

    fn send(&mut self, frame: ClientFrame) {
        if let Err(error) = self.core.send(frame) {
            warn!(%error, "watch stream send failed");
            self.close_with(Some(error));
        }
    }

    fn close_with(&mut self, error: Option<StreamError>) {
        self.core.close(error.as_ref());
        self.delegate.on_close(error);
    }

    fn handle_listen_response(&mut self, response: ListenResponse) {
        let ListenResponse {
            change,
            mut snapshot_version,
        } = response;

        if let WatchChange::TargetChange(target_change) = &change {
            if target_change.has_cause() {
                self.remove_targets(target_change);
            } else if !target_change.resume_token.is_empty() {
                self.record_resume_token(target_change);
            }

            if !target_change.target_ids.is_empty() {
                snapshot_version = SnapshotVersion::NONE;
            }
        }

        self.delegate.on_change(change, snapshot_version);
    }

    fn remove_targets(&mut self, change: &WatchTargetChange) {
        for target_id in &change.target_ids {
            if self.active_targets.remove(target_id).is_none() {
                hard_fail!("server removed {target_id}, which is not being watched");
            }
            debug!(%target_id, cause = ?change.cause, "target removed by server");
        }
    }

    fn record_resume_token(&mut self, change: &WatchTargetChange) {
        let token: &Bytes = &change.resume_token;
        if change.target_ids.is_empty() {
            for target in self.active_targets.values_mut() {
                *target = target.with_resume_token(token.clone());
            }
            return;
        }
        for target_id in &change.target_ids {
            if let Some(target) = self.active_targets.get_mut(target_id) {
                *target = target.with_resume_token(token.clone());
            }
        }
    }
}

impl<D: WatchStreamDelegate> Stream for WatchStream<D> {
    fn start(&mut self) {
        self.active_targets.clear();
        if let Err(error) = self.core.start() {
            self.delegate.on_close(Some(error));
        }
    }

    fn stop(&mut self) {
        self.core.stop();
        self.active_targets.clear();
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
            TransportEvent::Frame(ServerFrame::Listen(response)) => {
                if !self.is_open() {
                    self.close_with(Some(StreamError::Protocol(
                        "listen response before the watch stream opened".into(),
                    )));
                    return;
                }
                self.handle_listen_response(response);
            }
            TransportEvent::Frame(other) => {
                self.close_with(Some(StreamError::Protocol(format!(
                    "unexpected {} frame on the watch stream",
                    other.stream_kind()
                ))));
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
    use crate::testing::{pump, RecordingWatchDelegate, WatchEvent};
    use crate::transport::{event_channel, EventReceiver, MockConnector};
    use cirrus_model::{Query, QueryPurpose, ResourcePath};
    use cirrus_protocol::{Code, Status, TargetChangeState};

    struct Fixture {
        stream: WatchStream<RecordingWatchDelegate>,
        connector: Arc<MockConnector>,
        events: EventReceiver,
    }

    impl Fixture {
        fn new() -> Self {
            let (tx, events) = event_channel();
            let connector = Arc::new(MockConnector::new());
            let stream = WatchStream::new(
                StreamConfig::new("db"),
                Arc::clone(&connector) as Arc<dyn Connector>,
                Arc::new(EmptyCredentials),
                tx,
                RecordingWatchDelegate::default(),
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

        fn deliver(&mut self, change: impl Into<WatchChange>, version: SnapshotVersion) {
            self.connector
                .last_connection()
                .unwrap()
                .deliver(ServerFrame::Listen(ListenResponse::new(change, version)));
            pump(&mut self.stream, &mut self.events);
        }
    }

    fn query(id: i32) -> QueryData {
        QueryData::new(
            Query::at_path(ResourcePath::parse("rooms")),
            TargetId(id),
            1,
            QueryPurpose::Listen,
        )
        .with_snapshot_version(SnapshotVersion::from_seconds(3))
    }

    #[test]
    fn watch_query_clears_version_and_sends_listen() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.watch_query(query(1));

        let stored = fx.stream.active_target(TargetId(1)).unwrap();
        assert_eq!(stored.snapshot_version, SnapshotVersion::NONE);

        let sent = fx.connector.last_connection().unwrap().sent_frames();
        match &sent[..] {
            [ClientFrame::Listen(request)] => {
                assert_eq!(request.database, "db");
                assert_eq!(request.target.target_id, TargetId(1));
                assert_eq!(request.target.snapshot_version, SnapshotVersion::NONE);
            }
            other => panic!("expected one listen frame, got {other:?}"),
        }
    }

    #[test]
    fn unwatch_sends_unlisten_even_for_unknown_id() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.unwatch_target_id(TargetId(9));

        let sent = fx.connector.last_connection().unwrap().sent_frames();
        assert!(matches!(
            &sent[..],
            [ClientFrame::Unlisten(UnlistenRequest { target_id: TargetId(9), .. })]
        ));
    }

    #[test]
    fn resume_token_updates_listed_targets() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.watch_query(query(1));
        fx.stream.watch_query(query(2));

        fx.deliver(
            WatchTargetChange::new(TargetChangeState::Current, vec![TargetId(2)])
                .with_resume_token(Bytes::from_static(b"r2")),
            SnapshotVersion::from_seconds(8),
        );

        assert!(fx.stream.active_target(TargetId(1)).unwrap().resume_token.is_empty());
        assert_eq!(
            fx.stream.active_target(TargetId(2)).unwrap().resume_token,
            Bytes::from_static(b"r2")
        );
    }

    #[test]
    fn global_resume_token_updates_all_targets() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.watch_query(query(1));
        fx.stream.watch_query(query(2));

        fx.deliver(
            WatchTargetChange::new(TargetChangeState::NoChange, vec![])
                .with_resume_token(Bytes::from_static(b"all")),
            SnapshotVersion::from_seconds(8),
        );

        for target in fx.stream.active_targets().values() {
            assert_eq!(target.resume_token, Bytes::from_static(b"all"));
        }
        // No ids listed, so the version passes through.
        assert_eq!(
            fx.stream.delegate().changes().last().map(|(_, v)| *v),
            Some(SnapshotVersion::from_seconds(8))
        );
    }

    #[test]
    fn removal_without_cause_keeps_targets() {
        let mut fx = Fixture::new();
        fx.open();
        fx.stream.watch_query(query(1));
        fx.stream.unwatch_target_id(TargetId(1));

        fx.deliver(
            WatchTargetChange::new(TargetChangeState::Removed, vec![TargetId(1)]),
            SnapshotVersion::from_seconds(2),
        );

        assert!(fx.stream.is_open());
        assert_eq!(fx.stream.delegate().changes().len(), 1);
    }

    #[test]
    #[should_panic(expected = "not being watched")]
    fn removal_of_unknown_target_panics() {
        let mut fx = Fixture::new();
        fx.open();
        fx.deliver(
            WatchTargetChange::removed_with_cause(
                vec![TargetId(4)],
                Status::new(Code::PermissionDenied, "denied"),
            ),
            SnapshotVersion::NONE,
        );
    }

    #[test]
    fn wrong_stream_frame_closes_with_protocol_error() {
        let mut fx = Fixture::new();
        fx.open();
        fx.connector
            .last_connection()
            .unwrap()
            .deliver(ServerFrame::HandshakeAck(cirrus_protocol::HandshakeResponse {
                stream_token: Bytes::new(),
            }));
        pump(&mut fx.stream, &mut fx.events);

        assert_eq!(fx.stream.state(), StreamState::Error);
        assert!(matches!(
            fx.stream.delegate().events.last(),
            Some(WatchEvent::Close(Some(StreamError::Protocol(_))))
        ));
    }

    #[test]
    fn send_failure_closes_stream() {
        let mut fx = Fixture::new();
        fx.open();
        fx.connector.last_connection().unwrap().fail_sends();
        fx.stream.watch_query(query(1));

        assert_eq!(fx.stream.state(), StreamState::Error);
        assert!(matches!(
            fx.stream.delegate().events.last(),
            Some(WatchEvent::Close(Some(StreamError::Transport { .. })))
        ));
        // The entry was recorded before the send and stays until restart.
        assert!(fx.stream.active_target(TargetId(1)).is_some());
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
                WatchEvent::Open,
                WatchEvent::Close(Some(StreamError::Protocol("opened twice".into())))
            ]
        );
        assert!(fx.connector.last_connection().unwrap().is_closed());
    }
}
