//! Runs a stream on its own tokio task.
//!
//! Every stream operation and every transport event is handled on the
//! driver task, one at a time, so the stream never sees concurrent calls.
//! Callers reach the stream through a [`StreamHandle`].

use crate::error::{StreamError, StreamResult};
use crate::stream::{Stream, StreamState};
use crate::transport::EventReceiver;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Cloneable handle for calling into a driven stream.
pub struct StreamHandle<S> {
    jobs: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for StreamHandle<S> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
        }
    }
}

impl<S: Stream + 'static> StreamHandle<S> {
    /// Runs `f` against the stream on the driver task and returns its result.
    ///
    /// A contract violation inside `f` ends the driver task; the call then
    /// fails with [`StreamError::Shutdown`].
    pub async fn call<R, F>(&self, f: F) -> StreamResult<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<S> = Box::new(move |stream: &mut S| {
            let _ = tx.send(f(stream));
        });
        self.jobs.send(job).map_err(|_| StreamError::Shutdown)?;
        rx.await.map_err(|_| StreamError::Shutdown)
    }

    /// Starts the stream.
    pub async fn start(&self) -> StreamResult<()> {
        self.call(|stream| stream.start()).await
    }

    /// Stops the stream.
    pub async fn stop(&self) -> StreamResult<()> {
        self.call(|stream| stream.stop()).await
    }

    /// Returns the stream's state.
    pub async fn state(&self) -> StreamResult<StreamState> {
        self.call(|stream| stream.state()).await
    }
}

/// Owns a stream and serializes access to it.
pub struct StreamDriver;

impl StreamDriver {
    /// Spawns a task that owns `stream` and delivers `events` to it.
    ///
    /// The task runs until every [`StreamHandle`] is dropped, then returns
    /// the stream. Must be called from within a tokio runtime.
    pub fn spawn<S>(stream: S, events: EventReceiver) -> (StreamHandle<S>, JoinHandle<S>)
    where
        S: Stream + 'static,
    {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(stream, jobs_rx, events));
        (StreamHandle { jobs: jobs_tx }, task)
    }
}

async fn run<S: Stream>(
    mut stream: S,
    mut jobs: mpsc::UnboundedReceiver<Job<S>>,
    mut events: EventReceiver,
) -> S {
    debug!("stream driver started");
    loop {
        tokio::select! {
            job = jobs.recv() => match job {
                Some(job) => job(&mut stream),
                None => break,
            },
            Some(event) = events.recv() => stream.handle_event(event),
        }
    }
    debug!("stream driver stopped");
    stream.stop();
    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::credentials::EmptyCredentials;
    use crate::testing::{RecordingWatchDelegate, WatchEvent};
    use crate::transport::{event_channel, Connector, MockConnector};
    use crate::watch_stream::WatchStream;
    use std::sync::Arc;
    use std::time::Duration;

    type Watch = WatchStream<RecordingWatchDelegate>;

    async fn wait_for_state(handle: &StreamHandle<Watch>, state: StreamState) {
        for _ in 0..100 {
            if handle.state().await.unwrap() == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stream never reached {state}");
    }

    #[tokio::test]
    async fn driver_delivers_transport_events() {
        let (tx, rx) = event_channel();
        let connector = Arc::new(MockConnector::new());
        let stream = WatchStream::new(
            StreamConfig::new("db"),
            Arc::clone(&connector) as Arc<dyn Connector>,
            Arc::new(EmptyCredentials),
            tx,
            RecordingWatchDelegate::default(),
        );
        let (handle, task) = StreamDriver::spawn(stream, rx);

        handle.start().await.unwrap();
        connector.last_connection().unwrap().open();
        wait_for_state(&handle, StreamState::Open).await;

        let events = handle
            .call(|stream| stream.delegate().events.clone())
            .await
            .unwrap();
        assert_eq!(events, vec![WatchEvent::Open]);

        drop(handle);
        let stream = task.await.unwrap();
        assert_eq!(stream.state(), StreamState::Initial);
        assert!(connector.last_connection().unwrap().is_closed());
    }

    #[tokio::test]
    async fn contract_violation_ends_driver() {
        let (tx, rx) = event_channel();
        let stream = WatchStream::new(
            StreamConfig::new("db"),
            Arc::new(MockConnector::new()),
            Arc::new(EmptyCredentials),
            tx,
            RecordingWatchDelegate::default(),
        );
        let (handle, task) = StreamDriver::spawn(stream, rx);

        let result = handle
            .call(|stream| stream.unwatch_target_id(cirrus_model::TargetId(1)))
            .await;
        assert_eq!(result, Err(StreamError::Shutdown));
        assert!(matches!(task.await, Err(e) if e.is_panic()));
    }
}
