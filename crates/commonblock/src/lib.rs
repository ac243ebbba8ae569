//! commonblock: named numeric arrays shared between two independently
//! scheduled contexts.
//!
//! This is the facade crate that re-exports the public API of the
//! sub-crates. The C ABI lives in `commonblock-ffi`, which is built as a
//! separate `cdylib`.
//!
//! # Quick start
//!
//! ```rust
//! use std::thread;
//! use commonblock::prelude::*;
//!
//! let table = ArrayTable::builder()
//!     .array("a", vec![0.0f64; 3])
//!     .array("b", vec![0.0f64; 2])
//!     .build()
//!     .unwrap();
//!
//! thread::scope(|s| {
//!     let consumer = s.spawn(|| {
//!         table.signal().wait(1).unwrap();
//!         table.accessor::<f64>("a").unwrap().read(0..3).unwrap()
//!     });
//!
//!     table.accessor::<f64>("a").unwrap().write(0..3, &[1.0, 2.0, 3.0]).unwrap();
//!     table.signal().notify(1);
//!
//!     assert_eq!(consumer.join().unwrap(), vec![1.0, 2.0, 3.0]);
//! });
//!
//! // The record address is what a foreign context receives.
//! let layout = table.export_layout();
//! assert_eq!(layout.field_count(), 2);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `commonblock-core` | Element types, columns, field ids, errors |
//! | [`table`] | `commonblock-table` | Table, accessors, locks, signal, layout record, snapshots |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Element types, column storage, field ids, and errors (`commonblock-core`).
pub use commonblock_core as types;

/// The array table and everything built on it (`commonblock-table`).
///
/// [`table::ArrayTable`] is the entry point; [`table::ForeignBlock`] is the
/// consumer-side view of an exported [`table::ForeignLayout`].
pub use commonblock_table as table;

/// Common imports for typical use.
///
/// ```rust
/// use commonblock::prelude::*;
/// ```
pub mod prelude {
    // Storage and types
    pub use commonblock_core::{Column, Element, ElementType, FieldIndex};

    // Errors
    pub use commonblock_core::{ConfigError, TableError};

    // Table
    pub use commonblock_table::{
        ArrayTable, ArrayTableBuilder, FieldAccessor, FieldDescriptor, TableSnapshot,
    };

    // Configuration
    pub use commonblock_table::{OrderPolicy, SignalConfig, TableConfig};

    // Signalling and foreign access
    pub use commonblock_table::{ForeignBlock, ForeignLayout, LayoutView, StateSignal};
}
