//! Headless testing helpers: Harness, snapshot helpers.
//!
//! Use the [`Harness`] to build a tree, drive ticks and inspect nodes without
//! any host. Use [`markup`] to capture a subtree as plain text for
//! snapshot-style assertions.

pub mod harness;
pub mod snapshot;

pub use harness::{EventLog, Harness};
pub use snapshot::markup;
