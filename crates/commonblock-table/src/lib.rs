//! Shared-memory array table with field-level synchronization.
//!
//! An [`ArrayTable`] owns a fixed, ordered set of named numeric arrays.
//! Every field has its own reader-writer lock; one extra lock guards a
//! single `u64` state word that two independently scheduled contexts use
//! to hand control back and forth by polling. This crate is the only one
//! in the workspace besides `commonblock-ffi` that may contain `unsafe`
//! code.
//!
//! # Architecture
//!
//! ```text
//! ArrayTable
//! ├── FieldSlot[] (table order == lock order)
//! │   ├── FieldDescriptor (name, type tag, length, data address)
//! │   ├── FieldLock (parking_lot raw rwlock, addressable by handle)
//! │   └── Column (owned storage, only touched under the lock)
//! ├── FieldLock (state lock)
//! └── LayoutBlock → ForeignLayout (repr(C) record at a stable address,
//!     which also holds the live state word)
//! ```
//!
//! The exported [`ForeignLayout`] address is the only artifact another
//! context needs: [`ForeignBlock`] shows how such a context locates and
//! locks every field from the record alone.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod accessor;
pub mod config;
pub mod field;
pub mod foreign;
pub mod layout;
pub mod lock;
mod order;
pub mod signal;
pub mod snapshot;
pub mod table;

pub use accessor::FieldAccessor;
pub use config::{OrderPolicy, SignalConfig, TableConfig};
pub use field::FieldDescriptor;
pub use foreign::{ForeignAccessor, ForeignBlock};
pub use layout::{ForeignLayout, LayoutEntry, LayoutView, LAYOUT_VERSION};
pub use lock::{ExclusiveGuard, FieldLock, SharedGuard};
pub use signal::StateSignal;
pub use snapshot::TableSnapshot;
pub use table::{ArrayTable, ArrayTableBuilder};

pub use commonblock_core::{Column, Element, ElementType, FieldIndex, TableError};
