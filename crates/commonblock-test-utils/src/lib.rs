//! Test utilities for commonblock development.
//!
//! Prebuilt tables ([`fixtures`]) and a producer harness ([`harness`]) that
//! runs the writing side of a scenario on its own thread and reports back
//! over a channel, so a scenario that deadlocks fails with a timeout
//! instead of hanging the test binary.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod harness;

pub use fixtures::{mixed_table, scenario_table, wide_table};
pub use harness::{spawn_producer, ProducerHandle};
