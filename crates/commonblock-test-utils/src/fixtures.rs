//! Reusable tables.
//!
//! - [`scenario_table`]: `a` (3 x `f64`) and `b` (2 x `f64`), all zero.
//! - [`mixed_table`]: one field of every element type.
//! - [`wide_table`]: `n` equally sized `f64` fields, for snapshot tests.

use std::time::Duration;

use commonblock_core::{Column, ElementType};
use commonblock_table::{ArrayTable, SignalConfig, TableConfig};

/// Poll interval used by fixtures: short, so tests observe changes quickly.
pub const TEST_POLL: Duration = Duration::from_micros(200);

/// Timeout used by fixtures so a broken scenario fails instead of hanging.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Table configuration polling every [`TEST_POLL`] and giving up after
/// [`TEST_TIMEOUT`].
pub fn test_config() -> TableConfig {
    TableConfig {
        signal: SignalConfig {
            poll_interval: TEST_POLL,
            timeout: Some(TEST_TIMEOUT),
        },
        ..TableConfig::default()
    }
}

/// The two-field producer/consumer table.
pub fn scenario_table() -> ArrayTable {
    ArrayTable::builder()
        .array("a", vec![0.0f64; 3])
        .array("b", vec![0.0f64; 2])
        .config(test_config())
        .build()
        .expect("scenario table is valid")
}

/// One field per element type, named by its tag, each `len` long.
pub fn mixed_table(len: usize) -> ArrayTable {
    ElementType::ALL
        .into_iter()
        .fold(ArrayTable::builder(), |b, dtype| {
            b.array(dtype.tag(), Column::zeroed(dtype, len))
        })
        .config(test_config())
        .build()
        .expect("mixed table is valid")
}

/// `n` fields `f00`, `f01`, ... of `len` zeros each.
pub fn wide_table(n: usize, len: usize) -> ArrayTable {
    (0..n)
        .fold(ArrayTable::builder(), |b, i| {
            b.array(format!("f{i:02}"), vec![0.0f64; len])
        })
        .config(test_config())
        .build()
        .expect("wide table is valid")
}
