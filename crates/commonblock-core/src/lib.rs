//! Core types for commonblock array tables.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the table, the C ABI, and the foreign-side
//! reader: element type tags, typed column storage, field indices, and
//! the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod column;
pub mod dtype;
pub mod error;
pub mod id;

pub use column::Column;
pub use dtype::{Element, ElementType};
pub use error::{ConfigError, TableError};
pub use id::FieldIndex;
