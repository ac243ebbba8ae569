//! C-compatible status codes.
//!
//! [`CbStatus`] is a `repr(i32)` enum covering every error a C caller can
//! observe. Conversions from [`TableError`] are provided.

use commonblock_core::TableError;

/// Status code returned by every `cb_*` function.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CbStatus {
    /// Success.
    Ok = 0,
    /// Builder or table handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// An argument is null, misaligned, not UTF-8, or otherwise invalid;
    /// also rejected construction input.
    InvalidArgument = -2,
    /// No field with the given name.
    UnknownField = -3,
    /// Range outside the field.
    IndexOutOfRange = -4,
    /// Value count differs from the range length.
    ShapeMismatch = -5,
    /// Element type code does not match the field.
    TypeMismatch = -6,
    /// A state wait exceeded its deadline.
    TimedOut = -7,
    /// A lock could not be acquired, or a lock handle is null or not held.
    LockFailure = -8,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -20,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&TableError> for CbStatus {
    fn from(e: &TableError) -> Self {
        match e {
            TableError::InvalidInput { .. } => CbStatus::InvalidArgument,
            TableError::UnknownField { .. } => CbStatus::UnknownField,
            TableError::IndexOutOfRange { .. } => CbStatus::IndexOutOfRange,
            TableError::ShapeMismatch { .. } => CbStatus::ShapeMismatch,
            TableError::TypeMismatch { .. } => CbStatus::TypeMismatch,
            TableError::TimedOut { .. } => CbStatus::TimedOut,
            TableError::LockFailure { .. } => CbStatus::LockFailure,
        }
    }
}

impl From<TableError> for CbStatus {
    fn from(e: TableError) -> Self {
        CbStatus::from(&e)
    }
}
