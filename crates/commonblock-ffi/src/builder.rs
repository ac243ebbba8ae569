//! Table builder FFI: collect arrays and options before `cb_table_create`.
//!
//! A builder handle owns an [`ArrayTableBuilder`]. Each call copies its
//! inputs, so C buffers and strings may be freed as soon as it returns.

use std::ffi::{c_char, c_void};
use std::sync::Mutex;
use std::time::Duration;

use commonblock_core::ElementType;
use commonblock_table::{ArrayTableBuilder, OrderPolicy, SignalConfig};

use crate::convert::{c_slice, c_str, column_from_c, dispatch, element_type, to_usize, CElement};
use crate::handle::HandleTable;
use crate::status::CbStatus;

static BUILDERS: Mutex<HandleTable<ArrayTableBuilder>> = Mutex::new(HandleTable::new());

pub(crate) fn builders() -> &'static Mutex<HandleTable<ArrayTableBuilder>> {
    &BUILDERS
}

/// Apply `f` to the builder behind `handle`.
fn update(handle: u64, f: impl FnOnce(ArrayTableBuilder) -> ArrayTableBuilder) -> i32 {
    let mut builders = ffi_lock!(BUILDERS);
    let Some(slot) = builders.get_mut(handle) else {
        return CbStatus::InvalidHandle as i32;
    };
    let builder = std::mem::take(slot);
    *slot = f(builder);
    CbStatus::Ok as i32
}

/// Create an empty builder and write its handle to `builder_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_builder_create(builder_out: *mut u64) -> i32 {
    ffi_guard!({
        if builder_out.is_null() {
            return CbStatus::InvalidArgument as i32;
        }
        let handle = ffi_lock!(BUILDERS).insert(ArrayTableBuilder::new());
        // SAFETY: builder_out is non-null and valid per caller contract.
        unsafe { *builder_out = handle };
        CbStatus::Ok as i32
    })
}

/// Destroy a builder without building.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_builder_destroy(builder: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(BUILDERS).remove(builder) {
            Some(_) => CbStatus::Ok as i32,
            None => CbStatus::InvalidHandle as i32,
        }
    })
}

/// Add a field of `len` zero elements of type `dtype` (an element type code:
/// 0 = bool, 1 = int8, ... 10 = float64).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_builder_add_zeroed(
    builder: u64,
    name: *const c_char,
    dtype: u8,
    len: u64,
) -> i32 {
    ffi_guard!({
        // SAFETY: name is a NUL-terminated string per caller contract.
        let name = ffi_try!(unsafe { c_str(name) }).to_owned();
        let dtype = ffi_try!(element_type(dtype));
        let len = ffi_try!(to_usize(len));
        update(builder, |b| b.zeroed(name, dtype, len))
    })
}

/// Add a field holding a copy of `len` elements of type `dtype` read from
/// `data`. `bool` elements are read as bytes (non-zero is `true`).
///
/// `data` must be aligned for the element type; it may be null when
/// `len == 0`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_builder_add_array(
    builder: u64,
    name: *const c_char,
    dtype: u8,
    data: *const c_void,
    len: u64,
) -> i32 {
    ffi_guard!({
        // SAFETY: name is a NUL-terminated string per caller contract.
        let name = ffi_try!(unsafe { c_str(name) }).to_owned();
        let dtype = ffi_try!(element_type(dtype));
        let len = ffi_try!(to_usize(len));
        let column = ffi_try!(dispatch!(dtype, copy_column(data, len)));
        update(builder, |b| b.array(name, column))
    })
}

fn copy_column<T: CElement>(
    data: *const c_void,
    len: usize,
) -> Result<commonblock_core::Column, CbStatus> {
    // SAFETY: data addresses `len` elements per the caller contract of
    // `cb_builder_add_array`.
    #[allow(unsafe_code)]
    let raw = unsafe { c_slice::<T::Raw>(data, len) }?;
    Ok(column_from_c::<T>(raw))
}

/// Set the preferred field order from `count` names.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_builder_set_order(
    builder: u64,
    names: *const *const c_char,
    count: usize,
) -> i32 {
    ffi_guard!({
        // SAFETY: names addresses `count` string pointers per caller contract.
        let ptrs = ffi_try!(unsafe { c_slice::<*const c_char>(names.cast(), count) });
        let mut order = Vec::with_capacity(count);
        for &ptr in ptrs {
            // SAFETY: each entry is a NUL-terminated string per caller contract.
            order.push(ffi_try!(unsafe { c_str(ptr) }).to_owned());
        }
        update(builder, |b| b.order(order))
    })
}

/// Choose how the preferred order treats unknown or repeated names:
/// 0 = drop them, 1 = reject them when the table is created.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_builder_set_order_policy(builder: u64, policy: i32) -> i32 {
    ffi_guard!({
        let order_policy = match policy {
            0 => OrderPolicy::Prefer,
            1 => OrderPolicy::Strict,
            _ => return CbStatus::InvalidArgument as i32,
        };
        update(builder, |b| {
            let mut config = *b.current_config();
            config.order_policy = order_policy;
            b.config(config)
        })
    })
}

/// Set the table's signal polling: `poll_us` microseconds between reads
/// (0 keeps the 1 ms default) and a default wait timeout of `timeout_ms`
/// (0 waits forever).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_builder_set_signal(builder: u64, poll_us: u64, timeout_ms: u64) -> i32 {
    ffi_guard!({
        let signal = signal_config(poll_us, timeout_ms);
        if signal.validate().is_err() {
            return CbStatus::InvalidArgument as i32;
        }
        update(builder, |b| {
            let mut config = *b.current_config();
            config.signal = signal;
            b.config(config)
        })
    })
}

/// Signal configuration from the C convention: zero means default / none.
pub(crate) fn signal_config(poll_us: u64, timeout_ms: u64) -> SignalConfig {
    SignalConfig {
        poll_interval: match poll_us {
            0 => SignalConfig::DEFAULT_POLL_INTERVAL,
            us => Duration::from_micros(us),
        },
        timeout: (timeout_ms != 0).then(|| Duration::from_millis(timeout_ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_builder() -> u64 {
        let mut h = 0u64;
        assert_eq!(cb_builder_create(&mut h), CbStatus::Ok as i32);
        h
    }

    #[test]
    fn create_and_destroy() {
        let h = new_builder();
        assert_eq!(cb_builder_destroy(h), CbStatus::Ok as i32);
        assert_eq!(cb_builder_destroy(h), CbStatus::InvalidHandle as i32);
    }

    #[test]
    fn null_out_pointer_rejected() {
        assert_eq!(
            cb_builder_create(std::ptr::null_mut()),
            CbStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn bad_arguments_rejected() {
        let h = new_builder();
        assert_eq!(
            cb_builder_add_zeroed(h, std::ptr::null(), 0, 1),
            CbStatus::InvalidArgument as i32
        );
        assert_eq!(
            cb_builder_add_zeroed(h, c"x".as_ptr(), 99, 1),
            CbStatus::InvalidArgument as i32
        );
        assert_eq!(
            cb_builder_add_array(h, c"x".as_ptr(), 10, std::ptr::null(), 3),
            CbStatus::InvalidArgument as i32
        );
        assert_eq!(
            cb_builder_set_order_policy(h, 7),
            CbStatus::InvalidArgument as i32
        );
        assert_eq!(
            cb_builder_set_signal(h, 10_000, 1),
            CbStatus::InvalidArgument as i32
        );
        cb_builder_destroy(h);
    }

    #[test]
    fn stale_builder_handle() {
        let h = new_builder();
        cb_builder_destroy(h);
        assert_eq!(
            cb_builder_add_zeroed(h, c"x".as_ptr(), 0, 1),
            CbStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn signal_config_zero_means_default() {
        let c = signal_config(0, 0);
        assert_eq!(c, SignalConfig::default());
        let c = signal_config(250, 40);
        assert_eq!(c.poll_interval, Duration::from_micros(250));
        assert_eq!(c.timeout, Some(Duration::from_millis(40)));
    }
}
