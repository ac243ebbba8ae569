//! C ABI for commonblock array tables.
//!
//! Two audiences use this surface. The owning context builds a table
//! through opaque `u64` builder and table handles and hands the resulting
//! layout record address to the foreign context. The foreign context then
//! works purely from that record: it locks fields through the exported
//! lock handles and drives the state word through the `cb_state_*`
//! functions. This crate is one of two that may contain `unsafe` code
//! (along with `commonblock-table`).
//!
//! Every entry point returns a [`CbStatus`] as `i32` and never unwinds
//! across the boundary: panics are caught and reported as
//! [`CbStatus::Panicked`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, converting a caught panic into `CbStatus::Panicked`.
macro_rules! ffi_guard {
    ($body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(code) => code,
            Err(_) => {
                tracing::warn!("panic caught at FFI boundary");
                $crate::status::CbStatus::Panicked as i32
            }
        }
    };
}

/// Lock a handle-table mutex, returning `InternalError` if it is poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::CbStatus::InternalError as i32,
        }
    };
}

/// Unwrap a `Result<T, CbStatus>`, returning the status code on error.
macro_rules! ffi_try {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(status) => return $crate::status::CbStatus::from(status) as i32,
        }
    };
}

pub mod builder;
mod convert;
mod handle;
pub mod lock;
pub mod state;
pub mod status;
pub mod table;

pub use builder::{
    cb_builder_add_array, cb_builder_add_zeroed, cb_builder_create, cb_builder_destroy,
    cb_builder_set_order, cb_builder_set_order_policy, cb_builder_set_signal,
};
pub use lock::{
    cb_lock_exclusive, cb_lock_shared, cb_try_lock_exclusive, cb_try_lock_shared,
    cb_unlock_exclusive, cb_unlock_shared,
};
pub use state::{cb_layout_version, cb_state_notify, cb_state_read, cb_state_wait, cb_state_wait_mask};
pub use status::CbStatus;
pub use table::{
    cb_table_create, cb_table_destroy, cb_table_field_count, cb_table_layout, cb_table_read,
    cb_table_write,
};
