//! State word FFI over a layout record address.
//!
//! Waits poll the word under its state lock, sleeping `poll_us`
//! microseconds between reads (0 selects the 1 ms default) and giving up
//! with `TimedOut` after `timeout_ms` milliseconds (0 waits forever).

use commonblock_table::{ForeignBlock, ForeignLayout, StateSignal, LAYOUT_VERSION};

use crate::builder::signal_config;
use crate::status::CbStatus;

/// Signal over the state word of `layout`.
///
/// # Safety
///
/// `layout` must be null or the record address of a live table that
/// outlives `'a`.
#[allow(unsafe_code)]
unsafe fn signal<'a>(
    layout: *const ForeignLayout,
    poll_us: u64,
    timeout_ms: u64,
) -> Result<StateSignal<'a>, CbStatus> {
    // SAFETY: forwarded caller contract.
    let block = unsafe { ForeignBlock::from_raw(layout) }?;
    Ok(block.signal(signal_config(poll_us, timeout_ms))?)
}

/// Version of the layout record this library produces.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_layout_version() -> u32 {
    LAYOUT_VERSION
}

/// Read the state word into `value_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_state_read(layout: *const ForeignLayout, value_out: *mut u64) -> i32 {
    ffi_guard!({
        if value_out.is_null() {
            return CbStatus::InvalidArgument as i32;
        }
        // SAFETY: layout is a live record address per caller contract.
        let signal = ffi_try!(unsafe { signal(layout, 0, 0) });
        let value = signal.read();
        // SAFETY: value_out is non-null and valid per caller contract.
        unsafe { *value_out = value };
        CbStatus::Ok as i32
    })
}

/// Overwrite the state word.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_state_notify(layout: *const ForeignLayout, value: u64) -> i32 {
    ffi_guard!({
        // SAFETY: layout is a live record address per caller contract.
        let signal = ffi_try!(unsafe { signal(layout, 0, 0) });
        signal.notify(value);
        CbStatus::Ok as i32
    })
}

/// Block until the state word equals `target`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_state_wait(
    layout: *const ForeignLayout,
    target: u64,
    poll_us: u64,
    timeout_ms: u64,
) -> i32 {
    ffi_guard!({
        // SAFETY: layout is a live record address per caller contract.
        let signal = ffi_try!(unsafe { signal(layout, poll_us, timeout_ms) });
        ffi_try!(signal.wait(target));
        CbStatus::Ok as i32
    })
}

/// Block until `state & mask != 0`. A zero mask is rejected with
/// `InvalidArgument`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_state_wait_mask(
    layout: *const ForeignLayout,
    mask: u64,
    poll_us: u64,
    timeout_ms: u64,
) -> i32 {
    ffi_guard!({
        // SAFETY: layout is a live record address per caller contract.
        let signal = ffi_try!(unsafe { signal(layout, poll_us, timeout_ms) });
        ffi_try!(signal.wait_mask(mask));
        CbStatus::Ok as i32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonblock_table::ArrayTable;

    fn table() -> ArrayTable {
        ArrayTable::builder().array("a", vec![0u8]).build().unwrap()
    }

    #[test]
    fn null_layout_rejected() {
        let mut v = 0u64;
        assert_eq!(
            cb_state_read(std::ptr::null(), &mut v),
            CbStatus::InvalidArgument as i32
        );
        assert_eq!(
            cb_state_notify(std::ptr::null(), 1),
            CbStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn notify_then_read() {
        let t = table();
        let layout = t.export_layout().as_ptr();
        assert_eq!(cb_state_notify(layout, 9), 0);
        let mut v = 0u64;
        assert_eq!(cb_state_read(layout, &mut v), 0);
        assert_eq!(v, 9);
        assert_eq!(t.signal().read(), 9);
    }

    #[test]
    fn waits_time_out_and_reject_zero_mask() {
        let t = table();
        let layout = t.export_layout().as_ptr();
        assert_eq!(cb_state_wait(layout, 1, 100, 5), CbStatus::TimedOut as i32);
        assert_eq!(
            cb_state_wait_mask(layout, 0, 100, 5),
            CbStatus::InvalidArgument as i32
        );
        t.signal().notify(0b100);
        assert_eq!(cb_state_wait_mask(layout, 0b110, 100, 5), 0);
        assert_eq!(cb_state_wait(layout, 0b100, 0, 0), 0);
    }

    #[test]
    fn largest_timeout_is_accepted() {
        let t = table();
        let layout = t.export_layout().as_ptr();
        t.signal().notify(3);
        assert_eq!(cb_state_wait(layout, 3, 0, u64::MAX), 0);
        assert_eq!(cb_state_wait_mask(layout, 0b10, 0, u64::MAX), 0);
    }

    #[test]
    fn timeout_shorter_than_poll_rejected() {
        let t = table();
        let layout = t.export_layout().as_ptr();
        assert_eq!(
            cb_state_wait(layout, 1, 50_000, 1),
            CbStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn version_is_one() {
        assert_eq!(cb_layout_version(), 1);
    }
}
