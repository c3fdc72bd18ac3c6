//! # Cirrus Testkit
//!
//! Test utilities for Cirrus.
//!
//! This crate provides:
//! - Fixtures for documents, targets, batches and server frames
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cirrus_testkit::prelude::*;
//!
//! #[test]
//! fn acknowledges_batch() {
//!     let frame = write_result(b"token", 10, 1);
//!     // ... deliver the frame through a mock connection
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
