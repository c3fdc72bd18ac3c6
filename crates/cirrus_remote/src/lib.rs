//! # Cirrus Remote
//!
//! Long-lived streams between the client and the document backend.
//!
//! This crate provides:
//! - [`WatchStream`]: listens to query targets and reports watch changes
//! - [`WriteStream`]: sends mutation batches after a handshake and reports
//!   their acknowledgements in order
//! - The [`Connector`] seam the streams open channels through
//! - [`StreamDriver`] to run a stream on its own tokio task
//!
//! ## Lifecycle
//!
//! Both streams move through [`StreamState`]: `start` asks the connector for
//! a channel, the transport reports it opened, frames flow, and the channel
//! eventually closes. A close caused by an error is reported to the
//! delegate once and leaves the stream in `Error`; the owner decides when to
//! restart, using [`WatchStream::next_restart_delay`] as a hint. `stop`
//! abandons the channel silently.
//!
//! Calling an operation in a state that does not allow it is a programming
//! error and panics.

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod assert;

mod backoff;
mod config;
mod credentials;
mod driver;
mod error;
mod stream;
pub mod testing;
mod transport;
mod watch_stream;
mod write_stream;

pub use backoff::ExponentialBackoff;
pub use config::{BackoffConfig, StreamConfig};
pub use credentials::{CredentialsProvider, EmptyCredentials, StaticCredentials, Token};
pub use driver::{StreamDriver, StreamHandle};
pub use error::{StreamError, StreamResult};
pub use stream::{Stream, StreamState};
pub use transport::{
    event_channel, Connector, EventReceiver, EventSender, EventSink, FrameSender, Generation,
    MockConnection, MockConnector, StreamEvent, TransportEvent,
};
pub use watch_stream::{WatchStream, WatchStreamDelegate};
pub use write_stream::{WriteStream, WriteStreamDelegate};
